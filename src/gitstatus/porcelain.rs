//! Parsing for `git status --porcelain --branch` output.

/// Per-file counts from two-column short-status codes.
///
/// `staged` and `modified` are independent, possibly overlapping counts:
/// a file modified in the index and again in the worktree contributes
/// to both. They do not partition the file set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    /// Column 1 (index) carries a mutation marker.
    pub staged: u32,
    /// Column 2 (worktree) carries a mutation marker.
    pub modified: u32,
    /// `??` entries.
    pub untracked: u32,
}

/// Branch name and upstream divergence from the `##` header line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BranchHeader {
    /// Current branch, `None` on a detached HEAD.
    pub branch: Option<String>,
    /// Commits ahead of upstream.
    pub ahead: u32,
    /// Commits behind upstream.
    pub behind: u32,
}

/// Parse the combined `--porcelain --branch` output of one probe.
#[must_use]
pub fn parse_status_output(output: &str) -> (BranchHeader, StatusCounts) {
    let mut header = BranchHeader::default();
    let mut counts = StatusCounts::default();

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("## ") {
            header = parse_branch_header(rest);
            continue;
        }

        // Two-column codes; leading spaces are significant, never trim.
        let bytes = line.as_bytes();
        if bytes.len() < 2 {
            continue;
        }
        let (index_col, worktree_col) = (bytes[0], bytes[1]);
        if index_col == b'?' && worktree_col == b'?' {
            counts.untracked += 1;
            continue;
        }
        if index_col == b'!' && worktree_col == b'!' {
            continue;
        }
        if index_col != b' ' {
            counts.staged += 1;
        }
        if worktree_col != b' ' {
            counts.modified += 1;
        }
    }

    (header, counts)
}

/// Parse the `##` header body, e.g.
/// `main...origin/main [ahead 1, behind 2]`, `HEAD (no branch)`, or
/// `No commits yet on main`.
#[must_use]
pub fn parse_branch_header(rest: &str) -> BranchHeader {
    let mut header = BranchHeader::default();

    if let Some(open) = rest.find('[') {
        if let Some(close) = rest[open..].find(']') {
            for part in rest[open + 1..open + close].split(',') {
                let part = part.trim();
                if let Some(n) = part.strip_prefix("ahead ") {
                    header.ahead = n.trim().parse().unwrap_or(0);
                } else if let Some(n) = part.strip_prefix("behind ") {
                    header.behind = n.trim().parse().unwrap_or(0);
                }
            }
        }
    }

    if rest.starts_with("HEAD (no branch)") {
        return header;
    }
    if let Some(name) = rest.strip_prefix("No commits yet on ") {
        header.branch = Some(name.trim().to_owned());
        return header;
    }

    let mut name = rest;
    if let Some(pos) = name.find("...") {
        name = &name[..pos];
    } else if let Some(pos) = name.find(" [") {
        name = &name[..pos];
    }
    let name = name.trim();
    if !name.is_empty() {
        header.branch = Some(name.to_owned());
    }

    header
}
