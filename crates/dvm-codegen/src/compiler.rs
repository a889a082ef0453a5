//! Record -> generated source
//!
//! Editor kinds render lazy.nvim plugin specs (Lua table literals); terminal
//! kinds render zsh fragments. Compilation is a pure function of the record,
//! its resolved members and the compile options.

use crate::errors::CompileError;
use crate::lua::{self, Entry, LuaExpr};
use crate::plan::{lua_plan, PlanEntry, Renderer};
use crate::shell;
use dvm_manifest::{
    decode_record, AttributeValue, DecodeMode, DecodedRecord, Dependency, KeyBinding, ResourceKind,
    ResourceRecord, UnionValue,
};

pub const DEFAULT_INDENT_WIDTH: usize = 2;
pub const DEFAULT_PLUGIN_DIR: &str = "$HOME/.local/share/dvm/plugins";

/// Settings shared by every compilation in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub indent_width: usize,
    pub decode_mode: DecodeMode,
    /// Checkout root for manually loaded terminal plugins
    pub plugin_dir: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            indent_width: DEFAULT_INDENT_WIDTH,
            decode_mode: DecodeMode::Lenient,
            plugin_dir: DEFAULT_PLUGIN_DIR.to_string(),
        }
    }
}

/// A record together with the records its weak references resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct CompileUnit {
    pub record: ResourceRecord,
    /// Resolved members in emission order; empty for leaf kinds
    pub members: Vec<ResourceRecord>,
}

impl CompileUnit {
    pub fn leaf(record: ResourceRecord) -> Self {
        CompileUnit {
            record,
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.record.kind
    }
}

#[derive(Debug, Clone)]
pub struct ConfigCompiler {
    options: CompileOptions,
    indent: String,
}

impl Default for ConfigCompiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl ConfigCompiler {
    pub fn new(options: CompileOptions) -> Self {
        let indent = " ".repeat(options.indent_width.max(1));
        ConfigCompiler { options, indent }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile one unit into the full text of its artifact
    pub fn compile(&self, unit: &CompileUnit) -> Result<String, CompileError> {
        self.compile_parts(&unit.record, &unit.members)
    }

    /// Compile a record that has no weak references to resolve
    pub fn compile_record(&self, record: &ResourceRecord) -> Result<String, CompileError> {
        self.compile_parts(record, &[])
    }

    fn compile_parts(&self, record: &ResourceRecord, members: &[ResourceRecord]) -> Result<String, CompileError> {
        match record.kind {
            ResourceKind::NvimPlugin | ResourceKind::NvimTheme => {
                let spec = self.plugin_spec(record)?;
                Ok(self.lua_file(record, &spec))
            }
            ResourceKind::NvimPackage => {
                let specs = if record.enabled {
                    members
                        .iter()
                        .map(|member| self.plugin_spec(member).map(Entry::positional))
                        .collect::<Result<Vec<_>, _>>()?
                } else {
                    Vec::new()
                };
                Ok(self.lua_file(record, &LuaExpr::Block(specs)))
            }
            ResourceKind::TerminalPlugin => {
                let decoded = self.decode(record)?;
                let lines = shell::plugin_fragment(record, &decoded, &self.options.plugin_dir)?;
                Ok(shell_file(record, &lines))
            }
            ResourceKind::TerminalProfile => {
                let decoded = self.decode(record)?;
                let resolved = members
                    .iter()
                    .map(|member| self.decode(member).map(|d| (member, d)))
                    .collect::<Result<Vec<_>, _>>()?;
                let lines =
                    shell::profile_fragment(record, &decoded, &resolved, &self.options.plugin_dir)?;
                Ok(shell_file(record, &lines))
            }
        }
    }

    fn decode(&self, record: &ResourceRecord) -> Result<DecodedRecord, CompileError> {
        Ok(decode_record(record).resolve(self.options.decode_mode)?)
    }

    fn lua_file(&self, record: &ResourceRecord, spec: &LuaExpr) -> String {
        format!(
            "{}return {}\n",
            lua::header(record.kind.as_str(), &record.name),
            spec.render(&self.indent, 0)
        )
    }

    /// lazy.nvim spec table for a plugin or theme
    fn plugin_spec(&self, record: &ResourceRecord) -> Result<LuaExpr, CompileError> {
        let source = record
            .source_ref
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CompileError::MissingSource {
                kind: record.kind,
                name: record.name.clone(),
            })?;
        let decoded = self.decode(record)?;

        let mut entries = vec![Entry::positional(LuaExpr::string(source))];
        if !record.enabled {
            entries.push(Entry::keyed("enabled", LuaExpr::boolean(false)));
        }
        push_planned(&mut entries, &decoded, lua_plan(record.kind));
        if record.kind == ResourceKind::NvimTheme {
            if let Some(config) = theme_config(&decoded) {
                entries.push(Entry::keyed("config", config));
            }
        }
        Ok(LuaExpr::Block(entries))
    }
}

fn push_planned(entries: &mut Vec<Entry>, decoded: &DecodedRecord, plan: &[PlanEntry]) {
    for planned in plan {
        let Some(value) = decoded.get(planned.field) else {
            continue;
        };
        let expr = match (planned.renderer, value) {
            (Renderer::Function(params), AttributeValue::Code(code)) => Some(LuaExpr::function(params, code)),
            (Renderer::Function(_) | Renderer::Value, _) => attribute_expr(value),
        };
        if let Some(expr) = expr {
            entries.push(Entry::keyed(planned.key, expr));
        }
    }
}

/// Lua expression for a decoded attribute; `None` when there is nothing to emit
fn attribute_expr(value: &AttributeValue) -> Option<LuaExpr> {
    match value {
        AttributeValue::Text(text) => Some(LuaExpr::string(text)),
        AttributeValue::Flag(flag) => Some(LuaExpr::boolean(*flag)),
        AttributeValue::Integer(number) => Some(LuaExpr::integer(*number)),
        AttributeValue::Union(union) => union_expr(union),
        AttributeValue::Strings(items) => Some(LuaExpr::strings(items)),
        AttributeValue::Keys(keys) => Some(LuaExpr::Block(
            keys.iter().map(|k| Entry::positional(key_binding_expr(k))).collect(),
        )),
        AttributeValue::Dependencies(deps) => Some(LuaExpr::Block(
            deps.iter().map(|d| Entry::positional(dependency_expr(d))).collect(),
        )),
        AttributeValue::Code(code) => Some(LuaExpr::function("", code)),
        AttributeValue::Options(map) => Some(LuaExpr::from_map(map)),
    }
}

fn union_expr(value: &UnionValue) -> Option<LuaExpr> {
    match value {
        UnionValue::Absent => None,
        UnionValue::Scalar(s) => Some(LuaExpr::string(s)),
        UnionValue::List(items) => Some(LuaExpr::strings(items)),
        UnionValue::Object(members) => Some(LuaExpr::Block(
            members
                .iter()
                .filter_map(|(k, member)| union_expr(member).map(|expr| Entry::keyed(k, expr)))
                .collect(),
        )),
    }
}

/// `{ "<lhs>", "<action>", mode = ..., desc = "..." }`
fn key_binding_expr(binding: &KeyBinding) -> LuaExpr {
    let mut entries = vec![Entry::positional(LuaExpr::string(&binding.key))];
    if let Some(ref action) = binding.action {
        entries.push(Entry::positional(LuaExpr::string(action)));
    }
    if let Some(mode) = union_expr(&binding.mode) {
        entries.push(Entry::keyed("mode", mode));
    }
    if let Some(ref desc) = binding.desc {
        entries.push(Entry::keyed("desc", LuaExpr::string(desc)));
    }
    LuaExpr::Inline(entries)
}

fn dependency_expr(dependency: &Dependency) -> LuaExpr {
    match dependency {
        Dependency::Reference(reference) => LuaExpr::string(reference),
        Dependency::Detailed {
            reference,
            build,
            version,
            branch,
        } => {
            let mut entries = vec![Entry::positional(LuaExpr::string(reference))];
            for (key, value) in [("build", build), ("version", version), ("branch", branch)] {
                if let Some(value) = value {
                    entries.push(Entry::keyed(key, LuaExpr::string(value)));
                }
            }
            LuaExpr::Inline(entries)
        }
    }
}

/// Explicit theme config, or one that calls the theme's setup and applies
/// the colorscheme
fn theme_config(decoded: &DecodedRecord) -> Option<LuaExpr> {
    if let Some(AttributeValue::Code(code)) = decoded.get("config") {
        return Some(LuaExpr::function("_, opts", code));
    }
    let mut body = Vec::new();
    if let Some(AttributeValue::Text(module)) = decoded.get("module") {
        body.push(format!("require({}).setup(opts)", lua::quote(module)));
    }
    if let Some(AttributeValue::Text(colorscheme)) = decoded.get("colorscheme") {
        body.push(format!("vim.cmd.colorscheme({})", lua::quote(colorscheme)));
    }
    if body.is_empty() {
        return None;
    }
    Some(LuaExpr::Function {
        params: "_, opts",
        body,
    })
}

fn shell_file(record: &ResourceRecord, lines: &[String]) -> String {
    let mut out = shell::comment(&format!(
        "Generated by dvm from {} \"{}\". Edits will be overwritten.",
        record.kind, record.name
    ));
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvm_manifest::{from_manifest, parse_manifests, AttributeError};

    fn record(yaml: &str) -> ResourceRecord {
        let manifests = parse_manifests(yaml).unwrap_or_default();
        let Some(manifest) = manifests.first() else {
            panic!("no manifest in fixture");
        };
        match from_manifest(manifest) {
            Ok(record) => record,
            Err(err) => panic!("invalid fixture: {err}"),
        }
    }

    fn compile(record: &ResourceRecord) -> String {
        match ConfigCompiler::default().compile_record(record) {
            Ok(text) => text,
            Err(err) => panic!("compile failed: {err}"),
        }
    }

    fn telescope() -> ResourceRecord {
        ResourceRecord::new(ResourceKind::NvimPlugin, "telescope")
            .with_source("nvim-telescope/telescope.nvim")
            .with_attribute("lazy", "true")
            .with_attribute("cmd", r#"["Telescope"]"#)
            .with_attribute(
                "keys",
                r#"[{"key":"<leader>ff","action":"find_files","desc":"Find files"}]"#,
            )
    }

    #[test]
    fn test_telescope_spec() {
        let output = compile(&telescope());
        let expected = "\
-- Generated by dvm from NvimPlugin \"telescope\". Edits will be overwritten.
return {
  \"nvim-telescope/telescope.nvim\",
  lazy = true,
  cmd = { \"Telescope\" },
  keys = {
    { \"<leader>ff\", \"find_files\", desc = \"Find files\" },
  },
}
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_output_is_deterministic_with_unsorted_options() {
        let plugin = telescope().with_attribute(
            "opts",
            r#"{"zeta":{"y":1,"x":2},"alpha":"a","mid":[1,2]}"#,
        );
        let first = compile(&plugin);
        let second = compile(&plugin);
        assert_eq!(first, second);

        let alpha = first.find("alpha =").unwrap_or(usize::MAX);
        let mid = first.find("mid =").unwrap_or(usize::MAX);
        let zeta = first.find("zeta =").unwrap_or(usize::MAX);
        assert!(alpha < mid && mid < zeta, "{first}");
        assert!(first.contains("      x = 2,\n      y = 1,\n"));
    }

    #[test]
    fn test_union_scalar_and_list_dispatch() {
        let scalar = telescope().with_attribute("event", r#""VeryLazy""#);
        let list = telescope().with_attribute("event", r#"["VeryLazy"]"#);
        assert!(compile(&scalar).contains("  event = \"VeryLazy\",\n"));
        assert!(compile(&list).contains("  event = { \"VeryLazy\" },\n"));
    }

    #[test]
    fn test_config_reindents_and_drops_blank_lines() {
        let plugin = telescope().with_attribute(
            "config",
            r#""\nrequire(\"telescope\").setup(opts)\nrequire(\"telescope\").load_extension(\"fzf\")\n""#,
        );
        let output = compile(&plugin);
        assert!(output.contains(
            "  config = function(_, opts)\n    require(\"telescope\").setup(opts)\n    require(\"telescope\").load_extension(\"fzf\")\n  end,\n"
        ));
    }

    #[test]
    fn test_init_has_no_parameters() {
        let plugin = telescope().with_attribute("init", r#""vim.g.loaded = 1""#);
        assert!(compile(&plugin).contains("  init = function()\n    vim.g.loaded = 1\n  end,\n"));
    }

    #[test]
    fn test_malformed_dependencies_are_omitted() {
        let plugin = telescope().with_attribute("dependencies", "[oops");
        let output = compile(&plugin);
        assert!(!output.contains("dependencies"));
        assert!(output.contains("cmd = { \"Telescope\" }"));
    }

    #[test]
    fn test_strict_mode_surfaces_malformed_attribute() {
        let plugin = telescope().with_attribute("dependencies", "[oops");
        let compiler = ConfigCompiler::new(CompileOptions {
            decode_mode: DecodeMode::Strict,
            ..CompileOptions::default()
        });
        assert!(matches!(
            compiler.compile_record(&plugin),
            Err(CompileError::Attribute(AttributeError::Malformed { .. }))
        ));
    }

    #[test]
    fn test_missing_source_is_precondition_violation() {
        let broken = ResourceRecord::new(ResourceKind::NvimPlugin, "broken");
        let result = ConfigCompiler::default().compile_record(&broken);
        assert!(result.is_err_and(|e| e.is_precondition_violation()));
    }

    #[test]
    fn test_dependencies_and_key_modes() {
        let plugin = ResourceRecord::new(ResourceKind::NvimPlugin, "harpoon")
            .with_source("ThePrimeagen/harpoon")
            .with_attribute(
                "dependencies",
                r#"["nvim-lua/plenary.nvim",{"ref":"nvim-telescope/telescope-fzf-native.nvim","build":"make","branch":"main"}]"#,
            )
            .with_attribute("keys", r#"[{"key":"<leader>a","mode":["n","v"]},{"key":"<C-e>","mode":"n","action":"<cmd>Harpoon<cr>"}]"#);
        let output = compile(&plugin);
        assert!(output.contains(
            "  dependencies = {\n    \"nvim-lua/plenary.nvim\",\n    { \"nvim-telescope/telescope-fzf-native.nvim\", build = \"make\", branch = \"main\" },\n  },\n"
        ));
        assert!(output.contains("    { \"<leader>a\", mode = { \"n\", \"v\" } },\n"));
        assert!(output.contains("    { \"<C-e>\", \"<cmd>Harpoon<cr>\", mode = \"n\" },\n"));
    }

    #[test]
    fn test_disabled_plugin_and_indent_width() {
        let mut plugin = telescope();
        plugin.enabled = false;
        let compiler = ConfigCompiler::new(CompileOptions {
            indent_width: 4,
            ..CompileOptions::default()
        });
        let output = compiler.compile_record(&plugin).unwrap_or_default();
        assert!(output.contains("\n    \"nvim-telescope/telescope.nvim\",\n    enabled = false,\n"));
        assert!(output.contains("\n        { \"<leader>ff\""));
    }

    #[test]
    fn test_theme_config_is_synthesized() {
        let theme = record(
            r#"
apiVersion: devopsmaestro.io/v1
kind: NvimTheme
metadata:
  name: tokyonight
spec:
  repo: folke/tokyonight.nvim
  module: tokyonight
  colorscheme: tokyonight-night
  opts:
    style: night
"#,
        );
        let expected = "\
-- Generated by dvm from NvimTheme \"tokyonight\". Edits will be overwritten.
return {
  \"folke/tokyonight.nvim\",
  lazy = false,
  priority = 1000,
  opts = {
    style = \"night\",
  },
  config = function(_, opts)
    require(\"tokyonight\").setup(opts)
    vim.cmd.colorscheme(\"tokyonight-night\")
  end,
}
";
        assert_eq!(compile(&theme), expected);
    }

    #[test]
    fn test_package_nests_member_specs() {
        let package = ResourceRecord::new(ResourceKind::NvimPackage, "core")
            .with_attribute("plugins", r#"["telescope","oil"]"#);
        let oil = ResourceRecord::new(ResourceKind::NvimPlugin, "oil").with_source("stevearc/oil.nvim");
        let unit = CompileUnit {
            record: package,
            members: vec![telescope(), oil],
        };
        let output = ConfigCompiler::default().compile(&unit).unwrap_or_default();
        assert!(output.starts_with("-- Generated by dvm from NvimPackage \"core\""));
        assert!(output.contains("return {\n  {\n    \"nvim-telescope/telescope.nvim\",\n"));
        assert!(output.contains("      { \"<leader>ff\", \"find_files\", desc = \"Find files\" },\n"));
        assert!(output.ends_with("  {\n    \"stevearc/oil.nvim\",\n  },\n}\n"));
    }

    #[test]
    fn test_generated_lua_loads() {
        let plugin = telescope()
            .with_attribute("opts", r#"{"defaults":{"layout_strategy":"horizontal"},"end":true,"list":[1,null,"x"]}"#)
            .with_attribute("config", r#""local ok = \"yes\"\nreturn ok""#)
            .with_attribute("dependencies", r#"[{"ref":"a/b","version":"*"}]"#);
        let source = compile(&plugin);
        let lua = mlua::Lua::new();
        let loaded: mlua::Result<mlua::Table> = lua.load(&source).eval();
        assert!(loaded.is_ok(), "{source}\n{loaded:?}");
        let Ok(spec) = loaded else {
            return;
        };
        assert_eq!(spec.get::<String>(1).ok().as_deref(), Some("nvim-telescope/telescope.nvim"));
        assert_eq!(spec.get::<bool>("lazy").ok(), Some(true));
    }

    #[test]
    fn test_terminal_plugin_managers() {
        let base = r#"
apiVersion: devopsmaestro.io/v1
kind: TerminalPlugin
metadata:
  name: autosuggestions
spec:
  repo: zsh-users/zsh-autosuggestions
"#;
        let manual = compile(&record(base));
        assert_eq!(
            manual,
            "# Generated by dvm from TerminalPlugin \"autosuggestions\". Edits will be overwritten.\n\
             # autosuggestions\n\
             source \"$HOME/.local/share/dvm/plugins/zsh-autosuggestions/zsh-autosuggestions.plugin.zsh\"\n"
        );

        let deferred = compile(&record(&format!("{base}  loadMode: deferred\n")));
        assert!(deferred.contains("\nzsh-defer source \"$HOME/.local/share/dvm/plugins/zsh-autosuggestions/"));

        let antidote = compile(&record(&format!(
            "{base}  manager: antidote\n  loadMode: deferred\n  source: zsh-autosuggestions.zsh\n"
        )));
        assert!(antidote.contains(
            "\nantidote bundle zsh-users/zsh-autosuggestions path:zsh-autosuggestions.zsh kind:defer\n"
        ));

        let zinit = compile(&record(&format!("{base}  manager: zinit\n  loadMode: deferred\n")));
        assert!(zinit.contains("\nzinit ice wait lucid\nzinit light zsh-users/zsh-autosuggestions\n"));
    }

    #[test]
    fn test_terminal_builtin_plugin_with_env_and_config() {
        let plugin = record(
            r#"
apiVersion: devopsmaestro.io/v1
kind: TerminalPlugin
metadata:
  name: git
spec:
  builtin: git
  env:
    ZSH_GIT_PROMPT: "1"
    AAA_FIRST: "has space"
  config: |
    alias gs='git status'

    alias gp='git push'
"#,
        );
        assert_eq!(
            compile(&plugin),
            "# Generated by dvm from TerminalPlugin \"git\". Edits will be overwritten.\n\
             # git\n\
             plugins+=(git)\n\
             export AAA_FIRST='has space'\n\
             export ZSH_GIT_PROMPT=1\n\
             alias gs='git status'\n\
             alias gp='git push'\n"
        );
    }

    #[test]
    fn test_terminal_profile_inlines_members() {
        let profile = record(
            r#"
apiVersion: devopsmaestro.io/v1
kind: TerminalProfile
metadata:
  name: dev
spec:
  plugins: [git]
  env:
    EDITOR: nvim
  aliases:
    ll: ls -la
  init: |
    bindkey -e
"#,
        );
        let git = ResourceRecord::new(ResourceKind::TerminalPlugin, "git").with_builtin("git");
        let unit = CompileUnit {
            record: profile,
            members: vec![git],
        };
        let output = ConfigCompiler::default().compile(&unit).unwrap_or_default();
        assert_eq!(
            output,
            "# Generated by dvm from TerminalProfile \"dev\". Edits will be overwritten.\n\
             # dev\n\
             export EDITOR=nvim\n\
             alias ll='ls -la'\n\
             \n\
             # git\n\
             plugins+=(git)\n\
             \n\
             bindkey -e\n"
        );
    }
}
