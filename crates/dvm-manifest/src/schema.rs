//! Per-kind schema descriptors
//!
//! Every resource kind runs through the same codec and compiler; what differs
//! between kinds is data: which spec key carries the source reference, which
//! optional fields exist, what shape each one has, and which defaults apply
//! when a manifest leaves them unset. Field order here is the order fields
//! appear in exported manifests.

use crate::types::{AttributeValue, ResourceKind};

/// Native shape of an optional field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Text,
    Flag,
    Integer,
    StringOrList,
    StringList,
    KeyBindings,
    Dependencies,
    Code,
    Options,
}

impl FieldShape {
    pub fn describe(self) -> &'static str {
        match self {
            FieldShape::Text => "a string",
            FieldShape::Flag => "a boolean",
            FieldShape::Integer => "an integer",
            FieldShape::StringOrList => "a string or a list of strings",
            FieldShape::StringList => "a list of strings",
            FieldShape::KeyBindings => "a list of key binding objects with a 'key'",
            FieldShape::Dependencies => "a list of references or objects with a 'ref'",
            FieldShape::Code => "a block of source code",
            FieldShape::Options => "a mapping",
        }
    }
}

/// Value applied by the codec when a manifest leaves a field unset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Text(&'static str),
    Flag(bool),
    Integer(i64),
}

impl FieldDefault {
    pub fn value(self) -> AttributeValue {
        match self {
            FieldDefault::Text(text) => AttributeValue::Text(text.to_string()),
            FieldDefault::Flag(flag) => AttributeValue::Flag(flag),
            FieldDefault::Integer(number) => AttributeValue::Integer(number),
        }
    }
}

/// One optional spec field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: FieldShape,
    /// Accepted values for enumerated text fields; empty means any
    pub allowed: &'static [&'static str],
    pub default: Option<FieldDefault>,
}

impl FieldSpec {
    const fn new(name: &'static str, shape: FieldShape) -> Self {
        FieldSpec {
            name,
            shape,
            allowed: &[],
            default: None,
        }
    }

    const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    const fn or(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }
}

/// Where a kind's positional identifier comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRule {
    /// The named `spec` key must be present
    Required(&'static str),
    /// Exactly one of a repository reference or a builtin name
    OneOf {
        source: &'static str,
        builtin: &'static str,
    },
    /// The kind has no positional identifier
    Unsourced,
}

impl SourceRule {
    pub fn keys(self) -> Vec<&'static str> {
        match self {
            SourceRule::Required(key) => vec![key],
            SourceRule::OneOf { source, builtin } => vec![source, builtin],
            SourceRule::Unsourced => Vec::new(),
        }
    }
}

/// Schema descriptor for one resource kind
#[derive(Debug)]
pub struct KindSchema {
    pub kind: ResourceKind,
    pub source: SourceRule,
    pub fields: &'static [FieldSpec],
}

impl KindSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

pub const TERMINAL_MANAGERS: &[&str] = &["manual", "antidote", "zinit", "oh-my-zsh"];
pub const LOAD_MODES: &[&str] = &["immediate", "deferred"];

const NVIM_PLUGIN_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("branch", FieldShape::Text),
    FieldSpec::new("version", FieldShape::Text),
    FieldSpec::new("priority", FieldShape::Integer),
    FieldSpec::new("lazy", FieldShape::Flag),
    FieldSpec::new("event", FieldShape::StringOrList),
    FieldSpec::new("ft", FieldShape::StringOrList),
    FieldSpec::new("cmd", FieldShape::StringOrList),
    FieldSpec::new("keys", FieldShape::KeyBindings),
    FieldSpec::new("dependencies", FieldShape::Dependencies),
    FieldSpec::new("build", FieldShape::Text),
    FieldSpec::new("init", FieldShape::Code),
    FieldSpec::new("config", FieldShape::Code),
    FieldSpec::new("opts", FieldShape::Options),
];

const NVIM_THEME_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("colorscheme", FieldShape::Text),
    FieldSpec::new("module", FieldShape::Text),
    FieldSpec::new("lazy", FieldShape::Flag).or(FieldDefault::Flag(false)),
    FieldSpec::new("priority", FieldShape::Integer).or(FieldDefault::Integer(1000)),
    FieldSpec::new("dependencies", FieldShape::Dependencies),
    FieldSpec::new("opts", FieldShape::Options),
    FieldSpec::new("config", FieldShape::Code),
];

const NVIM_PACKAGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("extends", FieldShape::Text),
    FieldSpec::new("plugins", FieldShape::StringList),
];

const TERMINAL_PLUGIN_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("manager", FieldShape::Text)
        .one_of(TERMINAL_MANAGERS)
        .or(FieldDefault::Text("manual")),
    FieldSpec::new("loadMode", FieldShape::Text)
        .one_of(LOAD_MODES)
        .or(FieldDefault::Text("immediate")),
    FieldSpec::new("source", FieldShape::Text),
    FieldSpec::new("env", FieldShape::Options),
    FieldSpec::new("config", FieldShape::Code),
];

const TERMINAL_PROFILE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("plugins", FieldShape::StringList),
    FieldSpec::new("env", FieldShape::Options),
    FieldSpec::new("aliases", FieldShape::Options),
    FieldSpec::new("init", FieldShape::Code),
];

static NVIM_PLUGIN: KindSchema = KindSchema {
    kind: ResourceKind::NvimPlugin,
    source: SourceRule::Required("repo"),
    fields: NVIM_PLUGIN_FIELDS,
};

static NVIM_THEME: KindSchema = KindSchema {
    kind: ResourceKind::NvimTheme,
    source: SourceRule::Required("repo"),
    fields: NVIM_THEME_FIELDS,
};

static NVIM_PACKAGE: KindSchema = KindSchema {
    kind: ResourceKind::NvimPackage,
    source: SourceRule::Unsourced,
    fields: NVIM_PACKAGE_FIELDS,
};

static TERMINAL_PLUGIN: KindSchema = KindSchema {
    kind: ResourceKind::TerminalPlugin,
    source: SourceRule::OneOf {
        source: "repo",
        builtin: "builtin",
    },
    fields: TERMINAL_PLUGIN_FIELDS,
};

static TERMINAL_PROFILE: KindSchema = KindSchema {
    kind: ResourceKind::TerminalProfile,
    source: SourceRule::Unsourced,
    fields: TERMINAL_PROFILE_FIELDS,
};

/// Schema descriptor for a kind
pub fn schema(kind: ResourceKind) -> &'static KindSchema {
    match kind {
        ResourceKind::NvimPlugin => &NVIM_PLUGIN,
        ResourceKind::NvimTheme => &NVIM_THEME,
        ResourceKind::NvimPackage => &NVIM_PACKAGE,
        ResourceKind::TerminalPlugin => &TERMINAL_PLUGIN,
        ResourceKind::TerminalProfile => &TERMINAL_PROFILE,
    }
}
