// =============================================================================
// FIELDS — La table ordonnée nom de champ → valeur
// =============================================================================
//
// Un variant structuré déclare ses champs DANS UN ORDRE. Cet ordre sert
// à la construction positionnelle et à l'ordre de parcours des champs
// récursifs (gauche → droite).
//
// Deux formes d'entrée pour un constructeur :
//   FieldInput::named([("x", 3), ("y", 4)])    → par nom
//   FieldInput::positional([3, 4])             → dans l'ordre déclaré
//
// Une fois validée, l'entrée devient un `Fields` : toujours dans l'ordre
// déclaré, complet, et gelé dans l'instance.
//
// =============================================================================

use std::fmt;

use indexmap::IndexMap;

use super::codata::Observable;
use super::error::AdtError;
use super::instance::Instance;
use super::typeside::{self, Value};

/// Champs résolus d'un variant, dans l'ordre de déclaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields {
    entries: IndexMap<String, Value>,
}

impl Fields {
    pub fn new() -> Self {
        Fields {
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Noms des champs, dans l'ordre déclaré
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Lit un champ obligatoire
    pub fn value(&self, name: &str) -> Result<&Value, AdtError> {
        self.entries.get(name).ok_or_else(|| AdtError::FieldAccess {
            field: name.to_string(),
            expected: "un champ présent".to_string(),
            found: "rien".to_string(),
        })
    }

    pub fn int(&self, name: &str) -> Result<i64, AdtError> {
        let v = self.value(name)?;
        v.as_int().ok_or_else(|| mismatch(name, "Int", v))
    }

    pub fn float(&self, name: &str) -> Result<f64, AdtError> {
        let v = self.value(name)?;
        v.as_float().ok_or_else(|| mismatch(name, "Float", v))
    }

    pub fn bool(&self, name: &str) -> Result<bool, AdtError> {
        let v = self.value(name)?;
        v.as_bool().ok_or_else(|| mismatch(name, "Bool", v))
    }

    pub fn str(&self, name: &str) -> Result<&str, AdtError> {
        let v = self.value(name)?;
        v.as_str().ok_or_else(|| mismatch(name, "Str", v))
    }

    pub fn list(&self, name: &str) -> Result<&[Value], AdtError> {
        let v = self.value(name)?;
        v.as_list().ok_or_else(|| mismatch(name, "List", v))
    }

    pub fn instance(&self, name: &str) -> Result<&Instance, AdtError> {
        let v = self.value(name)?;
        v.as_instance().ok_or_else(|| mismatch(name, "Data", v))
    }

    pub fn observable(&self, name: &str) -> Result<&Observable, AdtError> {
        let v = self.value(name)?;
        v.as_observable().ok_or_else(|| mismatch(name, "Codata", v))
    }

    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.entries.insert(name.to_string(), value);
    }

    /// Remplace la valeur d'un champ existant et rend l'ancienne
    pub(crate) fn replace(&mut self, name: &str, value: Value) -> Option<Value> {
        self.entries
            .get_mut(name)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Vide la table en rendant les valeurs (utilisé par le drop itératif)
    pub(crate) fn drain_values(&mut self) -> Vec<Value> {
        self.entries.drain(..).map(|(_, v)| v).collect()
    }
}

fn mismatch(field: &str, expected: &str, found: &Value) -> AdtError {
    AdtError::FieldAccess {
        field: field.to_string(),
        expected: expected.to_string(),
        found: found.get_type().to_string(),
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        typeside::write_pending(f, typeside::Pending::Fields(self))
    }
}

/// Entrée d'un constructeur : par nom ou par position.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Named(Vec<(String, Value)>),
    Positional(Vec<Value>),
}

impl FieldInput {
    pub fn named<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        FieldInput::Named(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn positional<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        FieldInput::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Entrée vide (pour les singletons)
    pub fn empty() -> Self {
        FieldInput::Named(Vec::new())
    }
}

impl From<Fields> for FieldInput {
    fn from(fields: Fields) -> Self {
        FieldInput::Named(fields.entries.into_iter().collect())
    }
}
