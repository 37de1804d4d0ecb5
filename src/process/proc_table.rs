use crate::model::Matcher;
use procfs::process::{all_processes_with_root, Process};
use procfs::ProcResult;
use std::path::{Path, PathBuf};

/// Kernel truncates `comm` to this many bytes.
const COMM_LEN: usize = 15;

/// One live process as seen through procfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProcessEntry {
    pub pid: i32,
    pub name: String,
    pub zombie: bool,
    pub cmdline: Vec<String>,
}

impl ProcessEntry {
    fn argv0_basename(&self) -> Option<&str> {
        let argv0 = self.cmdline.first()?;
        Path::new(argv0).file_name()?.to_str()
    }

    pub(crate) fn matches(&self, matcher: &Matcher) -> bool {
        match matcher {
            Matcher::Name(name) => {
                if self.name == *name || self.argv0_basename() == Some(name.as_str()) {
                    return true;
                }
                name.len() > COMM_LEN
                    && self.name.len() == COMM_LEN
                    && name.starts_with(self.name.as_str())
            }
            Matcher::CommandLine(pattern) => {
                !self.cmdline.is_empty() && self.cmdline.join(" ").contains(pattern.as_str())
            }
        }
    }
}

/// Reader over a procfs mount. Tests point it at a fake tree.
#[derive(Debug, Clone)]
pub(crate) struct ProcTable {
    root: PathBuf,
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::at("/proc")
    }
}

impl ProcTable {
    pub(crate) fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read every process under the root. Processes that exit mid-scan are skipped.
    pub(crate) fn snapshot(&self) -> ProcResult<Vec<ProcessEntry>> {
        let mut out: Vec<ProcessEntry> = all_processes_with_root(&self.root)?
            .filter_map(|process| read_entry(&process.ok()?))
            .collect();
        out.sort_by_key(|p| p.pid);
        Ok(out)
    }

    /// Pids of live processes matching `matcher`, never including this process.
    pub(crate) fn find(&self, matcher: &Matcher) -> ProcResult<Vec<i32>> {
        let own = std::process::id() as i32;
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|p| p.pid != own && !p.zombie && p.matches(matcher))
            .map(|p| p.pid)
            .collect())
    }
}

fn read_entry(process: &Process) -> Option<ProcessEntry> {
    let stat = process.stat().ok()?;
    // Kernel threads and zombies have an empty command line.
    let cmdline = process.cmdline().unwrap_or_default();
    Some(ProcessEntry {
        pid: stat.pid,
        zombie: stat.state == 'Z',
        name: stat.comm,
        cmdline: cmdline.into_iter().filter(|arg| !arg.is_empty()).collect(),
    })
}
