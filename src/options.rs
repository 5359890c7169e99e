//! Configuration for one generation run.
//!
//! Every knob is an enumerated value; nothing here accepts free-form
//! behavior. Options files use camelCase keys and may omit anything.
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumStrategy {
    /// Literal union plus a companion value map.
    #[default]
    Union,
    /// `enum` declaration.
    Enum,
    /// `as const` tuple with the type derived from its element type.
    Const,
    /// Literal union intersected with a unique brand.
    Branded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateType {
    #[default]
    String,
    Date,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayStyle {
    /// `Array<T>`
    Generic,
    /// `T[]`
    #[default]
    Bracket,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectStyle {
    /// `Record<string, T>`
    #[default]
    GenericMap,
    /// `{ [key: string]: T }`
    IndexSignature,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum NullableStyle {
    #[default]
    #[serde(rename = "T|null", alias = "null")]
    Null,
    #[serde(rename = "T|undefined", alias = "undefined")]
    Undefined,
    #[serde(rename = "T|null|undefined", alias = "null-undefined")]
    NullAndUndefined,
}

/// What to do with inputs that have nothing to branch on (`enum: []`,
/// `oneOf: []`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Emit the bottom type `never` and record a warning.
    #[default]
    Never,
    /// Fail that named type with `DegenerateInput`.
    Error,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircularPolicy {
    /// Keep the forward reference and attach a `@circular` marker.
    #[default]
    Marker,
    Error,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyCase {
    #[default]
    UpperSnake,
    Preserve,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnumOptions {
    pub generate_helpers: bool,
    pub generate_validation: bool,
    pub generate_mapping: bool,
    pub sort_values: bool,
    pub key_case: KeyCase,
    pub key_prefix: String,
    pub key_suffix: String,
    pub empty_enum: DegeneratePolicy,
}

impl Default for EnumOptions {
    fn default() -> Self {
        Self {
            generate_helpers: true,
            generate_validation: false,
            generate_mapping: false,
            sort_values: false,
            key_case: KeyCase::UpperSnake,
            key_prefix: String::new(),
            key_suffix: String::new(),
            empty_enum: DegeneratePolicy::Never,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnionOptions {
    pub generate_helpers: bool,
    pub generate_validation: bool,
    /// Also infer discriminators for `anyOf` (always attempted for `oneOf`).
    pub prefer_discriminated_unions: bool,
    /// An inferred discriminator must also be `required` in every member.
    pub strict_discrimination: bool,
    pub empty_union: DegeneratePolicy,
}

impl Default for UnionOptions {
    fn default() -> Self {
        Self {
            generate_helpers: true,
            generate_validation: false,
            prefer_discriminated_unions: true,
            strict_discrimination: false,
            empty_union: DegeneratePolicy::Never,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompositionOptions {
    pub generate_utility_types: bool,
    pub generate_helpers: bool,
    pub circular_refs: CircularPolicy,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            generate_utility_types: true,
            generate_helpers: false,
            circular_refs: CircularPolicy::Marker,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterfaceOptions {
    pub generate_validation: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    pub enum_type: EnumStrategy,
    pub date_type: DateType,
    pub strict_null_checks: bool,
    pub generate_comments: bool,
    pub use_readonly: bool,
    pub array_type: ArrayStyle,
    pub object_type: ObjectStyle,
    pub nullable_type: NullableStyle,
    pub discriminated_unions: bool,
    pub max_depth: usize,
    pub inline_unions: bool,
    pub max_inline_complexity: usize,
    /// Prefix declarations with `export`.
    pub export: bool,
    /// `prop?: T` when set; `prop: T | undefined` otherwise.
    pub optional_markers: bool,

    pub enums: EnumOptions,
    pub unions: UnionOptions,
    pub composition: CompositionOptions,
    pub interfaces: InterfaceOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            enum_type: EnumStrategy::Union,
            date_type: DateType::String,
            strict_null_checks: true,
            generate_comments: true,
            use_readonly: false,
            array_type: ArrayStyle::Bracket,
            object_type: ObjectStyle::GenericMap,
            nullable_type: NullableStyle::Null,
            discriminated_unions: true,
            max_depth: 10,
            inline_unions: true,
            max_inline_complexity: 3,
            export: true,
            optional_markers: true,
            enums: EnumOptions::default(),
            unions: UnionOptions::default(),
            composition: CompositionOptions::default(),
            interfaces: InterfaceOptions::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(src: &str) -> Result<Self, String> {
        crate::path_de::from_str_with_path(src)
    }

    /// Set the enum lowering strategy.
    pub fn enum_type(mut self, value: EnumStrategy) -> Self {
        self.enum_type = value;
        self
    }

    /// Set the nullable representation.
    pub fn nullable_type(mut self, value: NullableStyle) -> Self {
        self.nullable_type = value;
        self
    }

    /// Set the array representation.
    pub fn array_type(mut self, value: ArrayStyle) -> Self {
        self.array_type = value;
        self
    }

    /// Set the composition depth bound.
    pub fn max_depth(mut self, value: usize) -> Self {
        self.max_depth = value;
        self
    }

    /// Set the date mapping for `format: date|date-time`.
    pub fn date_type(mut self, value: DateType) -> Self {
        self.date_type = value;
        self
    }

    pub(crate) fn export_prefix(&self) -> &'static str {
        if self.export { "export " } else { "" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let opts = Options::from_json_str("{}").unwrap();
        assert_eq!(opts, Options::default());
        assert_eq!(opts.max_depth, 10);
    }

    #[test]
    fn enumerated_spellings() {
        let opts = Options::from_json_str(
            r#"{
                "enumType": "branded",
                "nullableType": "T|null|undefined",
                "objectType": "index-signature",
                "arrayType": "generic",
                "enums": {"keyCase": "preserve", "emptyEnum": "error"},
                "composition": {"circularRefs": "error"}
            }"#,
        )
        .unwrap();
        assert_eq!(opts.enum_type, EnumStrategy::Branded);
        assert_eq!(opts.nullable_type, NullableStyle::NullAndUndefined);
        assert_eq!(opts.object_type, ObjectStyle::IndexSignature);
        assert_eq!(opts.array_type, ArrayStyle::Generic);
        assert_eq!(opts.enums.key_case, KeyCase::Preserve);
        assert_eq!(opts.enums.empty_enum, DegeneratePolicy::Error);
        assert_eq!(opts.composition.circular_refs, CircularPolicy::Error);
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!(Options::from_json_str(r#"{"enumType": "flags"}"#).is_err());
    }
}
