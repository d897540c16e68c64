//! Preset options and extension hooks.

use exmldoc::{Attribute, LayerSchema};

/// Which optional parts of the syntax preset to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxConfig {
    /// Add the `ne` (named entity) layer.
    pub want_ne: bool,
    /// Add `wsd-lexunits` and `wsd-comment` to words.
    pub want_wsd: bool,
    /// Add `dephead` and `deprel` to words.
    pub want_deps: bool,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            want_ne: true,
            want_wsd: false,
            want_deps: false,
        }
    }
}

impl SyntaxConfig {
    /// Only words, texts, sentences and nodes.
    pub fn minimal() -> Self {
        Self {
            want_ne: false,
            want_wsd: false,
            want_deps: false,
        }
    }

    pub fn with_ne(mut self, want: bool) -> Self {
        self.want_ne = want;
        self
    }

    pub fn with_wsd(mut self, want: bool) -> Self {
        self.want_wsd = want;
        self
    }

    pub fn with_deps(mut self, want: bool) -> Self {
        self.want_deps = want;
        self
    }
}

/// Additions to the preset for corpora with extra annotation.
#[derive(Debug, Clone, Default)]
pub struct DocExtensions {
    /// Extra attributes on the terminal layer.
    pub word_attrs: Vec<Attribute>,
    /// Extra markable layers.
    pub layers: Vec<LayerSchema>,
    /// Extra attributes for named layers, added after `layers`.
    pub layer_attrs: Vec<(String, Attribute)>,
}

impl DocExtensions {
    pub fn with_word_attr(mut self, att: Attribute) -> Self {
        self.word_attrs.push(att);
        self
    }

    pub fn with_layer(mut self, layer: LayerSchema) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_layer_attr(mut self, layer: &str, att: Attribute) -> Self {
        self.layer_attrs.push((layer.to_string(), att));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.word_attrs.is_empty() && self.layers.is_empty() && self.layer_attrs.is_empty()
    }
}
