//! Field emission plans
//!
//! A plan is the ordered list of fields a kind emits into its generated spec.
//! Order here is output order; it never depends on map iteration.

use dvm_manifest::ResourceKind;

/// How a planned field is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    /// Rendered from the decoded value's own shape
    Value,
    /// Code wrapped in a function literal with these parameters
    Function(&'static str),
}

/// One planned field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    /// Schema field read from the record
    pub field: &'static str,
    /// Key written into the generated table
    pub key: &'static str,
    pub renderer: Renderer,
}

const fn value(field: &'static str) -> PlanEntry {
    PlanEntry {
        field,
        key: field,
        renderer: Renderer::Value,
    }
}

const fn function(field: &'static str, params: &'static str) -> PlanEntry {
    PlanEntry {
        field,
        key: field,
        renderer: Renderer::Function(params),
    }
}

const NVIM_PLUGIN_PLAN: &[PlanEntry] = &[
    value("branch"),
    value("version"),
    value("build"),
    value("priority"),
    value("lazy"),
    value("event"),
    value("ft"),
    value("cmd"),
    value("keys"),
    value("dependencies"),
    function("init", ""),
    function("config", "_, opts"),
    value("opts"),
];

// `config` is emitted separately so it can be synthesized from
// `module` and `colorscheme`.
const NVIM_THEME_PLAN: &[PlanEntry] = &[
    value("lazy"),
    value("priority"),
    value("dependencies"),
    value("opts"),
];

/// The Lua emission plan for a kind; empty for kinds not rendered field by field
pub fn lua_plan(kind: ResourceKind) -> &'static [PlanEntry] {
    match kind {
        ResourceKind::NvimPlugin => NVIM_PLUGIN_PLAN,
        ResourceKind::NvimTheme => NVIM_THEME_PLAN,
        ResourceKind::NvimPackage | ResourceKind::TerminalPlugin | ResourceKind::TerminalProfile => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvm_manifest::{schema, FieldShape};

    #[test]
    fn test_plan_fields_exist_in_schema() {
        for kind in ResourceKind::ALL {
            let descriptor = schema(kind);
            for entry in lua_plan(kind) {
                let field = descriptor.field(entry.field);
                assert!(field.is_some(), "{kind}: plan field {} not in schema", entry.field);
                if let (Some(field), Renderer::Function(_)) = (field, entry.renderer) {
                    assert_eq!(field.shape, FieldShape::Code);
                }
            }
        }
    }

    #[test]
    fn test_every_plugin_field_is_planned() {
        let planned: Vec<&str> = lua_plan(ResourceKind::NvimPlugin).iter().map(|e| e.field).collect();
        for field in schema(ResourceKind::NvimPlugin).fields {
            assert!(planned.contains(&field.name), "{} missing from plan", field.name);
        }
    }
}
