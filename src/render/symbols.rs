//! Glyphs used by the renderer.

/// Session completion.
pub const QUERY: &str = "◉";
/// Finished item.
pub const COMPLETE: &str = "•";
/// Running item.
pub const ACTIVE: &str = "●";
/// Tool or subprocess label prefix.
pub const TOOL: &str = "→";
/// Failed item.
pub const ERROR: &str = "✗";

/// Guide before a child that has later siblings.
pub const BRANCH: &str = "├── ";
/// Guide before the last child.
pub const LAST_BRANCH: &str = "└── ";
/// Continuation below a child that has later siblings.
pub const PIPE: &str = "│   ";
/// Continuation below the last child.
pub const BLANK: &str = "    ";

/// Indentation per depth level in plain output.
pub const PLAIN_INDENT: &str = "  ";

/// Shown while nothing is renderable yet.
pub const PLACEHOLDER: &str = "Thinking...";
