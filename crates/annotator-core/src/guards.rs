//! Shared constants for collaborator boundaries and export formats.

/// Sentinel majority label for a community with no matched files.
pub const NO_LABEL: &str = "None";

/// Node attribute carrying the repository-relative file path.
pub const FILE_PATH_ATTRIBUTE: &str = "filePathRelative";

/// Extension of the dependency graph file written by the analysis tool.
pub const GRAPH_FILE_EXTENSION: &str = ".graphml";

/// Directory (under the tool output root) holding per-project results.
pub const TOOL_OUTPUT_DIR: &str = "arcanOutput";

/// Extension of the delimited text export.
pub const DELIMITED_EXTENSION: &str = "csv";

// Repository search guards
pub const SEARCH_BASE_URL: &str = "https://api.github.com/search/repositories";
pub const SEARCH_ACCEPT_HEADER: &str = "application/vnd.github+json";
pub const SEARCH_API_VERSION: &str = "2022-11-28";
pub const MAX_RESULTS_PER_PAGE: usize = 100;

/// Compute the search page for a requested amount of results.
pub fn search_page(amount: usize) -> usize {
    if amount > MAX_RESULTS_PER_PAGE {
        amount / MAX_RESULTS_PER_PAGE
    } else {
        1
    }
}
