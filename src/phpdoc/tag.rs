use serde::Serialize;

/// Tags understood without any registered line parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagKind {
    Param,
    Return,
    Var,
    Throws,
    Property,
    PropertyRead,
    PropertyWrite,
    Global,
    Method,
    Mixin,
    See,
    Link,
    Deprecated,
    Author,
    Since,
    Version,
    Todo,
    Internal,
    Abstract,
    Access,
    Category,
    Copyright,
    Example,
    Filesource,
    Final,
    Ignore,
    License,
    Magic,
    Name,
    Package,
    Static,
    Staticvar,
    Subpackage,
    Tutorial,
    Uses,
    Inheritdoc,
}

impl TagKind {
    /// Case-sensitive lookup of a tag name without the `@`.
    pub fn from_name(name: &str) -> Option<TagKind> {
        let kind = match name {
            "param" => TagKind::Param,
            "return" => TagKind::Return,
            "var" => TagKind::Var,
            "throws" => TagKind::Throws,
            "property" => TagKind::Property,
            "property-read" => TagKind::PropertyRead,
            "property-write" => TagKind::PropertyWrite,
            "global" => TagKind::Global,
            "method" => TagKind::Method,
            "mixin" => TagKind::Mixin,
            "see" => TagKind::See,
            "link" => TagKind::Link,
            "deprecated" => TagKind::Deprecated,
            "author" => TagKind::Author,
            "since" => TagKind::Since,
            "version" => TagKind::Version,
            "todo" => TagKind::Todo,
            "internal" => TagKind::Internal,
            "abstract" => TagKind::Abstract,
            "access" => TagKind::Access,
            "category" => TagKind::Category,
            "copyright" => TagKind::Copyright,
            "example" => TagKind::Example,
            "filesource" => TagKind::Filesource,
            "final" => TagKind::Final,
            "ignore" => TagKind::Ignore,
            "license" => TagKind::License,
            "magic" => TagKind::Magic,
            "name" => TagKind::Name,
            "package" => TagKind::Package,
            "static" => TagKind::Static,
            "staticvar" => TagKind::Staticvar,
            "subpackage" => TagKind::Subpackage,
            "tutorial" => TagKind::Tutorial,
            "uses" => TagKind::Uses,
            "inheritdoc" => TagKind::Inheritdoc,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            TagKind::Param => "param",
            TagKind::Return => "return",
            TagKind::Var => "var",
            TagKind::Throws => "throws",
            TagKind::Property => "property",
            TagKind::PropertyRead => "property-read",
            TagKind::PropertyWrite => "property-write",
            TagKind::Global => "global",
            TagKind::Method => "method",
            TagKind::Mixin => "mixin",
            TagKind::See => "see",
            TagKind::Link => "link",
            TagKind::Deprecated => "deprecated",
            TagKind::Author => "author",
            TagKind::Since => "since",
            TagKind::Version => "version",
            TagKind::Todo => "todo",
            TagKind::Internal => "internal",
            TagKind::Abstract => "abstract",
            TagKind::Access => "access",
            TagKind::Category => "category",
            TagKind::Copyright => "copyright",
            TagKind::Example => "example",
            TagKind::Filesource => "filesource",
            TagKind::Final => "final",
            TagKind::Ignore => "ignore",
            TagKind::License => "license",
            TagKind::Magic => "magic",
            TagKind::Name => "name",
            TagKind::Package => "package",
            TagKind::Static => "static",
            TagKind::Staticvar => "staticvar",
            TagKind::Subpackage => "subpackage",
            TagKind::Tutorial => "tutorial",
            TagKind::Uses => "uses",
            TagKind::Inheritdoc => "inheritdoc",
        }
    }

    /// `@param $x`-style tags carrying a variable after the type.
    pub fn has_variable(self) -> bool {
        matches!(
            self,
            TagKind::Param | TagKind::Property | TagKind::PropertyRead | TagKind::PropertyWrite | TagKind::Global
        )
    }

    /// Tags whose first word is always a type.
    pub fn is_type_only(self) -> bool {
        matches!(self, TagKind::Return | TagKind::Var | TagKind::Throws | TagKind::Mixin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AnnotationKind {
    Builtin(TagKind),
    /// Recognised by a registered line parser.
    Custom(String),
    Unknown(String),
}

impl AnnotationKind {
    pub fn name(&self) -> &str {
        match self {
            AnnotationKind::Builtin(kind) => kind.name(),
            AnnotationKind::Custom(name) | AnnotationKind::Unknown(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(TagKind::from_name("property-read"), Some(TagKind::PropertyRead));
        assert_eq!(TagKind::from_name("Param"), None);
        assert_eq!(TagKind::from_name("inheritDoc"), None);
    }

    #[test]
    fn names_round_trip() {
        for name in ["param", "method", "staticvar", "inheritdoc", "property-write"] {
            assert_eq!(TagKind::from_name(name).map(TagKind::name), Some(name));
        }
    }
}
