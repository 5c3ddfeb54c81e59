/*!
actions.rs - static registry of Dashboard remote actions.

Each `ActionSpec` names one `Dashboard.<action>` procedure and owns the
ordered list of parameters it accepts. The table is plain data; validation
lives in `shared.rs`.

Field naming follows the prefixed schema (`overlay_*`, `widget_*`). The older
unprefixed names (`user_id`, `id`, `shared`, ...) are not accepted.

Helpers:
  - resolve(name)    -> Option<&ActionSpec>
  - catalog()        -> usage text listing every action and its parameters
*/

use std::fmt;

use crate::cmd::format::{StyleOptions, TableOpts, table};

/// Declared type of a single action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Text,
    Boolean,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamKind::Integer => "integer",
            ParamKind::Text => "text",
            ParamKind::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// One parameter accepted by an action.
///
/// `default` is the value the server assumes when the parameter is omitted.
/// It is shown in usage text only and never injected into a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: Option<&'static str>,
    pub required: bool,
}

impl ParamSpec {
    const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            default: None,
            required: true,
        }
    }

    const fn optional(name: &'static str, kind: ParamKind, default: Option<&'static str>) -> Self {
        Self {
            name,
            kind,
            default,
            required: false,
        }
    }
}

/// A remote action and its parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
}

impl ActionSpec {
    /// Look up a declared parameter by exact name.
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Name of the remote procedure (`Dashboard.<action>`).
    pub fn method_name(&self) -> String {
        format!("Dashboard.{}", self.name)
    }
}

/* ---- Registry Table ---- */

use ParamKind::{Boolean, Integer, Text};

const OVERLAY_REF: &[ParamSpec] = &[
    ParamSpec::required("overlay_user_id", Integer),
    ParamSpec::required("overlay_id", Integer),
];

const OVERLAY_SAVE: &[ParamSpec] = &[
    ParamSpec::optional("overlay_shared", Boolean, Some("true")),
    ParamSpec::required("overlay_name", Text),
    ParamSpec::required("overlay_description", Text),
];

const WIDGET_FIELDS: &[ParamSpec] = &[
    ParamSpec::optional("widget_col", Integer, None),
    ParamSpec::optional("widget_color", Text, None),
    ParamSpec::optional("widget_collapsible", Boolean, Some("true")),
    ParamSpec::optional("widget_controls", Boolean, Some("true")),
    ParamSpec::optional("widget_editable", Boolean, Some("true")),
    ParamSpec::optional("widget_height", Integer, None),
    ParamSpec::required("widget_id", Integer),
    ParamSpec::optional("widget_maximizable", Boolean, Some("true")),
    ParamSpec::optional("widget_minimized", Boolean, Some("false")),
    ParamSpec::optional("widget_movable", Boolean, Some("true")),
    ParamSpec::optional("widget_pos", Integer, None),
    ParamSpec::optional("widget_refreshable", Boolean, Some("true")),
    ParamSpec::optional("widget_refresh", Integer, None),
    ParamSpec::optional("widget_removable", Boolean, Some("true")),
    ParamSpec::optional("widget_resizable", Boolean, Some("true")),
    ParamSpec::optional("widget_title", Text, None),
    ParamSpec::optional("widget_type", Text, None),
    ParamSpec::optional("widget_url", Text, None),
];

const FEED: &[ParamSpec] = &[ParamSpec::required("url", Text)];

/// All known actions, sorted by name (the order used in usage text).
pub static ACTIONS: &[ActionSpec] = &[
    ActionSpec { name: "add_column", params: &[] },
    ActionSpec { name: "clear_workspace", params: &[] },
    ActionSpec { name: "delete_column", params: &[] },
    ActionSpec { name: "delete_overlay", params: OVERLAY_REF },
    ActionSpec { name: "get_feed", params: FEED },
    ActionSpec { name: "get_overlays", params: &[] },
    ActionSpec { name: "get_preferences", params: &[] },
    ActionSpec { name: "load_overlay", params: OVERLAY_REF },
    ActionSpec { name: "new_widget", params: WIDGET_FIELDS },
    ActionSpec { name: "publish_overlay", params: OVERLAY_REF },
    ActionSpec { name: "save_overlay", params: OVERLAY_SAVE },
    ActionSpec { name: "save_widget", params: WIDGET_FIELDS },
];

/// Find an action by exact name.
pub fn resolve(name: &str) -> Option<&'static ActionSpec> {
    ACTIONS.iter().find(|a| a.name == name)
}

/* ---- Usage Catalog ---- */

/// Render the usage epilogue: argument syntax, an example, and every action
/// with its parameter table. Plain text (no ANSI) so it can be embedded in
/// clap help output.
pub fn catalog(program: &str) -> String {
    let style = StyleOptions::plain();
    let mut out = String::new();

    out.push_str("An argument is a single key=value pair.\n\n");
    out.push_str("Example:\n");
    out.push_str(&format!(
        "    {program} save_overlay overlay_shared=true overlay_name=test overlay_description=demo\n\n"
    ));
    out.push_str("<ACTION> is one of:\n");

    for action in ACTIONS {
        out.push_str(&format!("\n  {}:\n", action.name));
        if action.params.is_empty() {
            out.push_str("    (no parameters)\n");
            continue;
        }
        let rows: Vec<Vec<String>> = action
            .params
            .iter()
            .map(|p| {
                vec![
                    p.name.to_string(),
                    p.kind.to_string(),
                    if p.required { "yes" } else { "no" }.to_string(),
                    p.default.unwrap_or("-").to_string(),
                ]
            })
            .collect();
        let tbl = table(
            &["NAME", "TYPE", "REQUIRED", "DEFAULT"],
            &rows,
            TableOpts {
                header_sep: false,
                ..TableOpts::default()
            },
            &style,
        );
        for line in tbl.lines() {
            out.push_str("    ");
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

/* ---- Tests ---- */
