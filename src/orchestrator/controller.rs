//! Layout controller.
//!
//! Reads the flag, mutates it, then issues the process actions for the new layout. The flag
//! is always changed first: if that fails nothing else happens, and once it succeeds it is
//! never rolled back, whatever the processes do.

use crate::error::ToggleError;
use crate::model::{ActionReport, ActionStatus, ProcessAction, ProcessSpec, ToggleOutcome, ToggleState};
use crate::process::{Effect, ProcessController};
use crate::state::StateStore;

pub(crate) struct Toggler<S, P> {
    store: S,
    processes: P,
    helper: ProcessSpec,
    panel: ProcessSpec,
}

impl<S: StateStore, P: ProcessController> Toggler<S, P> {
    pub(crate) fn new(store: S, processes: P, helper: ProcessSpec, panel: ProcessSpec) -> Self {
        Self {
            store,
            processes,
            helper,
            panel,
        }
    }

    /// Current layout, read from the flag without taking the lock.
    pub(crate) fn status(&self) -> Result<ToggleState, ToggleError> {
        self.store.is_set().map(ToggleState::from_flag)
    }

    /// Flip to the other layout.
    pub(crate) async fn toggle(&self) -> Result<ToggleOutcome, ToggleError> {
        let _lock = self.store.lock()?;
        let from = self.status()?;
        self.transition(from, from.flipped()).await
    }

    /// Converge on `target`. When already there the flag is left alone and the process
    /// actions are issued again.
    pub(crate) async fn apply(&self, target: ToggleState) -> Result<ToggleOutcome, ToggleError> {
        let _lock = self.store.lock()?;
        let from = self.status()?;
        self.transition(from, target).await
    }

    async fn transition(
        &self,
        from: ToggleState,
        to: ToggleState,
    ) -> Result<ToggleOutcome, ToggleError> {
        let flag_changed = from != to;
        if flag_changed {
            if to.flag_set() {
                self.store.set()?;
            } else {
                self.store.clear()?;
            }
        }
        tracing::info!(from = from.as_str(), to = to.as_str(), flag_changed, "layout");

        let action = match to {
            ToggleState::LauncherFocused => ProcessAction::Terminate,
            ToggleState::PanelFocused => ProcessAction::Start,
        };
        let actions = vec![
            self.run(&self.helper, action).await,
            self.run(&self.panel, action).await,
        ];

        Ok(ToggleOutcome {
            from,
            to,
            flag_changed,
            actions,
        })
    }

    async fn run(&self, spec: &ProcessSpec, action: ProcessAction) -> ActionReport {
        let result = match action {
            ProcessAction::Terminate => self.processes.terminate(spec).await,
            ProcessAction::Start => self.processes.start(spec).await,
        };
        let status = match result {
            Ok(Effect::NotRunning) => ActionStatus::Skipped("not running".into()),
            Ok(Effect::AlreadyRunning) => ActionStatus::Skipped("already running".into()),
            Ok(Effect::Signalled(count)) => {
                tracing::debug!(process = %spec.label, count, "signalled");
                ActionStatus::Done
            }
            Ok(Effect::Spawned(pid)) => {
                tracing::debug!(process = %spec.label, ?pid, "started");
                ActionStatus::Done
            }
            Err(e) => {
                tracing::warn!(process = %spec.label, ?action, "{e}");
                ActionStatus::Failed(e.to_string())
            }
        };
        ActionReport {
            process: spec.label.clone(),
            action,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FileOp, ProcessControlError};
    use crate::model::Matcher;
    use crate::state::FlagFileStore;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::path::Path;

    /// Records every request; optionally fails all of them.
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(ProcessAction, String)>>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn record(&self, action: ProcessAction, spec: &ProcessSpec) -> Result<(), ProcessControlError> {
            self.calls.borrow_mut().push((action, spec.label.clone()));
            if self.fail {
                let source = procfs::ProcError::Other("boom".into());
                return Err(ProcessControlError::Scan(source));
            }
            Ok(())
        }
    }

    impl ProcessController for &Recorder {
        async fn terminate(&self, spec: &ProcessSpec) -> Result<Effect, ProcessControlError> {
            self.record(ProcessAction::Terminate, spec)?;
            Ok(Effect::Signalled(1))
        }

        async fn start(&self, spec: &ProcessSpec) -> Result<Effect, ProcessControlError> {
            self.record(ProcessAction::Start, spec)?;
            Ok(Effect::Spawned(None))
        }
    }

    fn spec(label: &str, matcher: Matcher) -> ProcessSpec {
        ProcessSpec {
            label: label.into(),
            program: label.into(),
            args: vec![],
            matcher,
        }
    }

    fn toggler<'a>(store: FlagFileStore, rec: &'a Recorder) -> Toggler<FlagFileStore, &'a Recorder> {
        Toggler::new(
            store,
            rec,
            spec("helper", Matcher::CommandLine("postx/panel-helper".into())),
            spec("panel", Matcher::Name("tint2".into())),
        )
    }

    fn store_in(dir: &Path) -> FlagFileStore {
        FlagFileStore::new(dir.join(".flag"), Some(dir.join("lock")))
    }

    fn calls(rec: &Recorder) -> Vec<(ProcessAction, String)> {
        rec.calls.borrow().clone()
    }

    #[tokio::test]
    async fn absent_flag_enters_launcher_and_stops_both() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Recorder::default();
        let t = toggler(store_in(dir.path()), &rec);

        let outcome = t.toggle().await.unwrap();

        assert_eq!(outcome.from, ToggleState::PanelFocused);
        assert_eq!(outcome.to, ToggleState::LauncherFocused);
        assert!(outcome.flag_changed);
        assert!(dir.path().join(".flag").exists());
        assert_eq!(
            calls(&rec),
            vec![
                (ProcessAction::Terminate, "helper".to_string()),
                (ProcessAction::Terminate, "panel".to_string()),
            ]
        );
        assert_eq!(outcome.failed_actions(), 0);
    }

    #[tokio::test]
    async fn present_flag_enters_panel_and_starts_both() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".flag"), b"").unwrap();
        let rec = Recorder::default();
        let t = toggler(store_in(dir.path()), &rec);

        let outcome = t.toggle().await.unwrap();

        assert_eq!(outcome.to, ToggleState::PanelFocused);
        assert!(!dir.path().join(".flag").exists());
        assert_eq!(
            calls(&rec),
            vec![
                (ProcessAction::Start, "helper".to_string()),
                (ProcessAction::Start, "panel".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn parity_of_invocations_decides_layout() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Recorder::default();
        let t = toggler(store_in(dir.path()), &rec);

        for n in 1..=7 {
            let outcome = t.toggle().await.unwrap();
            let expected = if n % 2 == 1 {
                ToggleState::LauncherFocused
            } else {
                ToggleState::PanelFocused
            };
            assert_eq!(outcome.to, expected, "after {n} toggles");
            assert_eq!(t.status().unwrap(), expected);
        }
        assert_eq!(calls(&rec).len(), 14);
    }

    #[tokio::test]
    async fn double_toggle_restores_either_start() {
        for preset in [false, true] {
            let dir = tempfile::tempdir().unwrap();
            if preset {
                std::fs::write(dir.path().join(".flag"), b"").unwrap();
            }
            let rec = Recorder::default();
            let t = toggler(store_in(dir.path()), &rec);
            t.toggle().await.unwrap();
            t.toggle().await.unwrap();
            assert_eq!(dir.path().join(".flag").exists(), preset);
        }
    }

    #[tokio::test]
    async fn unwritable_home_fails_before_any_process_action() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("gone");
        let rec = Recorder::default();
        let t = toggler(FlagFileStore::new(home.join(".flag"), None), &rec);

        match t.toggle().await {
            Err(ToggleError::FileAccess { op, .. }) => assert_eq!(op, FileOp::Create),
            other => panic!("expected FileAccess, got {other:?}"),
        }
        assert!(!home.exists());
        assert!(calls(&rec).is_empty());
    }

    #[tokio::test]
    async fn undeletable_flag_fails_before_any_process_action() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".flag")).unwrap();
        let rec = Recorder::default();
        let t = toggler(store_in(dir.path()), &rec);

        assert!(matches!(
            t.toggle().await,
            Err(ToggleError::FileAccess {
                op: FileOp::Remove,
                ..
            })
        ));
        assert!(dir.path().join(".flag").is_dir());
        assert!(calls(&rec).is_empty());
    }

    #[tokio::test]
    async fn unlockable_store_fails_before_touching_anything() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join(".flag");
        let lock = dir.path().join("missing").join("lock");
        let rec = Recorder::default();

        let t = toggler(FlagFileStore::new(&flag, Some(lock.clone())), &rec);
        match t.toggle().await {
            Err(ToggleError::Lock { path, .. }) => assert_eq!(path, lock),
            other => panic!("expected Lock, got {other:?}"),
        }
        assert!(!flag.exists());

        std::fs::write(&flag, b"").unwrap();
        let t = toggler(FlagFileStore::new(&flag, Some(lock.clone())), &rec);
        assert!(matches!(
            t.apply(ToggleState::PanelFocused).await,
            Err(ToggleError::Lock { .. })
        ));
        assert!(flag.exists());
        assert!(calls(&rec).is_empty());
    }

    #[tokio::test]
    async fn process_failures_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Recorder::failing();
        let t = toggler(store_in(dir.path()), &rec);

        let outcome = t.toggle().await.unwrap();

        assert!(dir.path().join(".flag").exists());
        assert_eq!(outcome.failed_actions(), 2);
        // Both actions were still attempted.
        assert_eq!(calls(&rec).len(), 2);
    }

    #[tokio::test]
    async fn apply_current_layout_reissues_actions_only() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Recorder::default();
        let t = toggler(store_in(dir.path()), &rec);

        let outcome = t.apply(ToggleState::PanelFocused).await.unwrap();

        assert!(!outcome.flag_changed);
        assert_eq!(outcome.from, outcome.to);
        assert!(!dir.path().join(".flag").exists());
        assert_eq!(
            calls(&rec),
            vec![
                (ProcessAction::Start, "helper".to_string()),
                (ProcessAction::Start, "panel".to_string()),
            ]
        );

        let outcome = t.apply(ToggleState::LauncherFocused).await.unwrap();
        assert!(outcome.flag_changed);
        assert!(dir.path().join(".flag").exists());
    }

    #[tokio::test]
    async fn status_does_not_mutate() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Recorder::default();
        let t = toggler(store_in(dir.path()), &rec);
        assert_eq!(t.status().unwrap(), ToggleState::PanelFocused);
        assert!(!dir.path().join(".flag").exists());
        assert!(calls(&rec).is_empty());
    }

    fn hammer(dir: &Path, lock: bool, threads: usize) {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let flag = dir.join(".flag");
                let lock_path = lock.then(|| dir.join("lock"));
                std::thread::spawn(move || {
                    let rt = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .unwrap();
                    let rec = Recorder::default();
                    let t = toggler(FlagFileStore::new(flag, lock_path), &rec);
                    let res = rt.block_on(t.toggle());
                    res.map(|_| ())
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
    }

    #[test]
    fn unlocked_racing_toggles_touch_only_the_marker() {
        let dir = tempfile::tempdir().unwrap();
        hammer(dir.path(), false, 8);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        // Final state is unspecified without the lock; only the marker may exist.
        assert!(names.iter().all(|n| n == ".flag"), "unexpected files: {names:?}");
    }

    #[test]
    fn locked_racing_toggles_serialise() {
        let dir = tempfile::tempdir().unwrap();
        hammer(dir.path(), true, 8);
        assert!(!dir.path().join(".flag").exists());
        hammer(dir.path(), true, 5);
        assert!(dir.path().join(".flag").exists());
    }
}
