//! Display configuration: which members are documented and how they are laid out.

use crate::entity::EntityKind;
use crate::error::{DocError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A display option toggling a class of members on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocOption {
    /// Document members of modules and classes at all
    Members,
    /// Include members without a docstring
    UndocMembers,
    /// Include `_private` members
    PrivateMembers,
    /// Include `__special__` members
    SpecialMembers,
    /// Include members imported from other modules
    ImportedMembers,
    /// Include members inherited from ancestor classes
    InheritedMembers,
    /// Show the list of base classes
    ShowInheritance,
    /// Show an inheritance diagram
    ShowInheritanceDiagram,
    /// Show a summary table on module pages
    ShowModuleSummary,
}

impl DocOption {
    pub const ALL: [DocOption; 9] = [
        DocOption::Members,
        DocOption::UndocMembers,
        DocOption::PrivateMembers,
        DocOption::SpecialMembers,
        DocOption::ImportedMembers,
        DocOption::InheritedMembers,
        DocOption::ShowInheritance,
        DocOption::ShowInheritanceDiagram,
        DocOption::ShowModuleSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocOption::Members => "members",
            DocOption::UndocMembers => "undoc-members",
            DocOption::PrivateMembers => "private-members",
            DocOption::SpecialMembers => "special-members",
            DocOption::ImportedMembers => "imported-members",
            DocOption::InheritedMembers => "inherited-members",
            DocOption::ShowInheritance => "show-inheritance",
            DocOption::ShowInheritanceDiagram => "show-inheritance-diagram",
            DocOption::ShowModuleSummary => "show-module-summary",
        }
    }
}

impl fmt::Display for DocOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocOption {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        DocOption::ALL
            .iter()
            .copied()
            .find(|option| option.as_str() == s)
            .ok_or_else(|| DocError::invalid_option(s, "unknown display option"))
    }
}

/// Set of enabled display options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocOptions(BTreeSet<DocOption>);

impl Default for DocOptions {
    fn default() -> Self {
        Self::from_iter([
            DocOption::Members,
            DocOption::UndocMembers,
            DocOption::PrivateMembers,
            DocOption::ShowInheritance,
            DocOption::ShowModuleSummary,
            DocOption::SpecialMembers,
            DocOption::ImportedMembers,
        ])
    }
}

impl FromIterator<DocOption> for DocOptions {
    fn from_iter<I: IntoIterator<Item = DocOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl DocOptions {
    /// No options enabled.
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Parse a list of kebab-case option names.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names
            .iter()
            .map(|name| name.as_ref().trim().parse())
            .collect::<Result<BTreeSet<_>>>()
            .map(Self)
    }

    pub fn contains(&self, option: DocOption) -> bool {
        self.0.contains(&option)
    }

    pub fn insert(&mut self, option: DocOption) -> bool {
        self.0.insert(option)
    }

    pub fn remove(&mut self, option: DocOption) -> bool {
        self.0.remove(&option)
    }

    pub fn iter(&self) -> impl Iterator<Item = DocOption> + '_ {
        self.0.iter().copied()
    }
}

/// Ordering applied to the members of every object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberOrder {
    /// Keep source order
    #[default]
    Bysource,
    /// Sort by name
    Alphabetical,
    /// Sort by kind group, then name
    Groupwise,
}

impl FromStr for MemberOrder {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bysource" => Ok(MemberOrder::Bysource),
            "alphabetical" => Ok(MemberOrder::Alphabetical),
            "groupwise" => Ok(MemberOrder::Groupwise),
            other => Err(DocError::invalid_option(
                "member_order",
                format!("unknown member order '{other}'"),
            )),
        }
    }
}

/// Which docstring a class page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassContent {
    /// The class docstring
    #[default]
    Class,
    /// The constructor docstring, falling back to the class docstring
    Init,
    /// Class docstring followed by the constructor docstring
    Both,
}

impl FromStr for ClassContent {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "class" => Ok(ClassContent::Class),
            "init" => Ok(ClassContent::Init),
            "both" => Ok(ClassContent::Both),
            other => Err(DocError::invalid_option(
                "class_content",
                format!("unknown class content '{other}'"),
            )),
        }
    }
}

/// Kinds that may be given their own page, from the coarsest to the finest.
pub const OWN_PAGE_LEVELS: [EntityKind; 9] = [
    EntityKind::Package,
    EntityKind::Module,
    EntityKind::Class,
    EntityKind::Exception,
    EntityKind::Function,
    EntityKind::Method,
    EntityKind::Property,
    EntityKind::Attribute,
    EntityKind::Data,
];

/// Options controlling what the object model displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub member_order: MemberOrder,
    pub class_content: ClassContent,
    pub options: DocOptions,
    /// Finest kind rendered on its own page
    pub own_page_level: EntityKind,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            member_order: MemberOrder::Bysource,
            class_content: ClassContent::Class,
            options: DocOptions::default(),
            own_page_level: EntityKind::Module,
        }
    }
}

impl DisplayConfig {
    pub fn with_options(mut self, options: DocOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_member_order(mut self, member_order: MemberOrder) -> Self {
        self.member_order = member_order;
        self
    }

    pub fn with_class_content(mut self, class_content: ClassContent) -> Self {
        self.class_content = class_content;
        self
    }

    pub fn with_own_page_level(mut self, level: EntityKind) -> Self {
        self.own_page_level = level;
        self
    }

    /// Reject an own-page level that is not a page kind.
    pub fn validate(&self) -> Result<()> {
        if !OWN_PAGE_LEVELS.contains(&self.own_page_level) {
            return Err(DocError::invalid_option(
                "own_page_level",
                format!("'{}' cannot have its own page", self.own_page_level),
            ));
        }
        Ok(())
    }

    /// Kinds rendered on their own page under the configured level.
    pub fn own_page_types(&self) -> &'static [EntityKind] {
        let level = OWN_PAGE_LEVELS
            .iter()
            .position(|kind| *kind == self.own_page_level)
            .unwrap_or(1);
        &OWN_PAGE_LEVELS[..=level]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DocOptions::default();
        assert!(options.contains(DocOption::Members));
        assert!(options.contains(DocOption::ImportedMembers));
        assert!(!options.contains(DocOption::InheritedMembers));
    }

    #[test]
    fn test_parse_options() {
        let options = DocOptions::parse(&["members", " undoc-members"]).unwrap();
        assert!(options.contains(DocOption::UndocMembers));
        assert!(!options.contains(DocOption::PrivateMembers));

        let err = DocOptions::parse(&["members", "no-such-option"]).unwrap_err();
        assert!(err.to_string().contains("no-such-option"));
    }

    #[test]
    fn test_options_deserialize_from_kebab_case() {
        let config: DisplayConfig =
            serde_json::from_str(r#"{"options": ["members", "inherited-members"], "member_order": "groupwise"}"#)
                .unwrap();
        assert!(config.options.contains(DocOption::InheritedMembers));
        assert_eq!(config.member_order, MemberOrder::Groupwise);
        assert_eq!(config.class_content, ClassContent::Class);
    }

    #[test]
    fn test_own_page_types() {
        let config = DisplayConfig::default();
        assert_eq!(
            config.own_page_types(),
            &[EntityKind::Package, EntityKind::Module]
        );
        let config = config.with_own_page_level(EntityKind::Class);
        assert_eq!(config.own_page_types().len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_placeholder_level() {
        let config = DisplayConfig::default().with_own_page_level(EntityKind::Placeholder);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("init".parse::<ClassContent>().unwrap(), ClassContent::Init);
        assert_eq!(
            "alphabetical".parse::<MemberOrder>().unwrap(),
            MemberOrder::Alphabetical
        );
        assert!("random".parse::<MemberOrder>().is_err());
    }
}
