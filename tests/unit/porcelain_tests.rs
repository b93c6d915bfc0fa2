//! Unit tests for porcelain short-status parsing.

use swarm_watch::gitstatus::porcelain::{parse_branch_header, parse_status_output};

/// Column 1 marks staged, column 2 marks modified, `??` is untracked only.
#[test]
fn two_column_codes_classified() {
    let (_, counts) = parse_status_output(" M a\nM  b\nA  c\n?? d\n");
    assert_eq!(counts.staged, 2, "b and c are staged");
    assert_eq!(counts.modified, 1, "a is modified");
    assert_eq!(counts.untracked, 1, "d is untracked");
}

/// A file mutated in the index and again in the worktree counts in both
/// tallies; staged and modified overlap rather than partition.
#[test]
fn double_mutation_counts_twice() {
    let (_, counts) = parse_status_output("MM e\n");
    assert_eq!(counts.staged, 1);
    assert_eq!(counts.modified, 1);
    assert_eq!(counts.untracked, 0);
}

#[test]
fn ignored_entries_and_short_lines_skipped() {
    let (_, counts) = parse_status_output("!! vendor\n\nx\n D gone\n");
    assert_eq!(counts.staged, 0);
    assert_eq!(counts.modified, 1, "only the deletion counts");
    assert_eq!(counts.untracked, 0);
}

#[test]
fn renames_count_as_staged() {
    let (_, counts) = parse_status_output("R  old -> new\n");
    assert_eq!(counts.staged, 1);
    assert_eq!(counts.modified, 0);
}

#[test]
fn branch_header_with_upstream_divergence() {
    let header = parse_branch_header("main...origin/main [ahead 3, behind 2]");
    assert_eq!(header.branch.as_deref(), Some("main"));
    assert_eq!(header.ahead, 3);
    assert_eq!(header.behind, 2);
}

#[test]
fn branch_header_without_upstream() {
    let header = parse_branch_header("feature/polling-tail");
    assert_eq!(header.branch.as_deref(), Some("feature/polling-tail"));
    assert_eq!(header.ahead, 0);
    assert_eq!(header.behind, 0);
}

#[test]
fn detached_head_has_no_branch() {
    let header = parse_branch_header("HEAD (no branch)");
    assert_eq!(header.branch, None);
}

#[test]
fn unborn_branch_is_named() {
    let header = parse_branch_header("No commits yet on main");
    assert_eq!(header.branch.as_deref(), Some("main"));
}

#[test]
fn full_output_combines_header_and_counts() {
    let output = "## main...origin/main [ahead 1]\n M src/lib.rs\n?? notes.txt\n";
    let (header, counts) = parse_status_output(output);
    assert_eq!(header.branch.as_deref(), Some("main"));
    assert_eq!(header.ahead, 1);
    assert_eq!(header.behind, 0);
    assert_eq!(counts.modified, 1);
    assert_eq!(counts.untracked, 1);
}
