// =============================================================================
// TYPESIDE — L'univers des valeurs et les gardes de type
// =============================================================================
//
// Les champs d'un variant portent des VALEURS. Une valeur est soit un
// atome (Int, Str, Bool...), soit une instance d'une famille (donnée
// algébrique), soit un observable (codonnée).
//
// Une GARDE est un prédicat de type sur une valeur : elle décide à la
// construction si un champ est acceptable. Quatre formes :
//   - Any       → tout est accepté
//   - Type(t)   → la valeur doit avoir le type de base t
//   - Family(F) → la valeur doit être une instance de F (ou d'un enfant)
//   - Predicate → prédicat arbitraire, nommé pour les diagnostics
//
// =============================================================================

use std::fmt;
use std::rc::Rc;

use super::codata::Observable;
use super::family::Family;
use super::fields::Fields;
use super::instance::Instance;

/// Un type de base dans l'univers des valeurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List,
    /// Instance d'une famille, quelle qu'elle soit
    Data,
    /// Observable d'une interface de codonnées
    Codata,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BaseType::Unit => "Unit",
            BaseType::Bool => "Bool",
            BaseType::Int => "Int",
            BaseType::Float => "Float",
            BaseType::Str => "Str",
            BaseType::List => "List",
            BaseType::Data => "Data",
            BaseType::Codata => "Codata",
        };
        write!(f, "{}", name)
    }
}

/// Une valeur concrète : le contenu d'un champ, une graine, un résultat.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Data(Instance),
    Codata(Observable),
}

impl Value {
    /// Retourne le BaseType correspondant à cette valeur
    pub fn get_type(&self) -> BaseType {
        match self {
            Value::Unit => BaseType::Unit,
            Value::Bool(_) => BaseType::Bool,
            Value::Int(_) => BaseType::Int,
            Value::Float(_) => BaseType::Float,
            Value::Str(_) => BaseType::Str,
            Value::List(_) => BaseType::List,
            Value::Data(_) => BaseType::Data,
            Value::Codata(_) => BaseType::Codata,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Data(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Value::Data(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn as_observable(&self) -> Option<&Observable> {
        match self {
            Value::Codata(obs) => Some(obs),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pending(f, Pending::Value(self))
    }
}

/// Morceau d'affichage en attente sur la pile d'écriture.
pub(crate) enum Pending<'a> {
    Text(&'static str),
    Label(&'a str),
    Value(&'a Value),
    Fields(&'a Fields),
    Instance(&'a Instance),
}

/// Écrit une valeur imbriquée avec une pile explicite : une chaîne de
/// 100 000 instances s'affiche sans consommer la pile native.
pub(crate) fn write_pending(f: &mut fmt::Formatter<'_>, start: Pending<'_>) -> fmt::Result {
    let mut stack = vec![start];
    while let Some(item) = stack.pop() {
        match item {
            Pending::Text(text) => f.write_str(text)?,
            Pending::Label(name) => write!(f, "{}: ", name)?,
            Pending::Value(value) => match value {
                Value::Unit => f.write_str("()")?,
                Value::Bool(b) => write!(f, "{}", b)?,
                Value::Int(i) => write!(f, "{}", i)?,
                Value::Float(x) => write!(f, "{}", x)?,
                Value::Str(s) => write!(f, "\"{}\"", s)?,
                Value::List(items) => {
                    f.write_str("[")?;
                    stack.push(Pending::Text("]"));
                    for (i, item) in items.iter().enumerate().rev() {
                        stack.push(Pending::Value(item));
                        if i > 0 {
                            stack.push(Pending::Text(", "));
                        }
                    }
                }
                Value::Data(inst) => stack.push(Pending::Instance(inst)),
                Value::Codata(obs) => write!(f, "{}", obs)?,
            },
            Pending::Fields(fields) => {
                let entries: Vec<_> = fields.iter().collect();
                for (i, (name, value)) in entries.into_iter().enumerate().rev() {
                    stack.push(Pending::Value(value));
                    stack.push(Pending::Label(name));
                    if i > 0 {
                        stack.push(Pending::Text(", "));
                    }
                }
            }
            Pending::Instance(inst) => {
                f.write_str(inst.variant_name())?;
                if !inst.fields().is_empty() {
                    f.write_str("(")?;
                    stack.push(Pending::Text(")"));
                    stack.push(Pending::Fields(inst.fields()));
                }
            }
        }
    }
    Ok(())
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Instance> for Value {
    fn from(inst: Instance) -> Self {
        Value::Data(inst)
    }
}

impl From<Observable> for Value {
    fn from(obs: Observable) -> Self {
        Value::Codata(obs)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

/// Prédicat nommé : la description sert aux messages d'erreur.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    test: Rc<dyn Fn(&Value) -> bool>,
}

impl Predicate {
    pub fn new(description: &str, test: impl Fn(&Value) -> bool + 'static) -> Self {
        Predicate {
            description: description.to_string(),
            test: Rc::new(test),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.test)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.description)
    }
}

/// Garde de type d'un champ.
#[derive(Debug, Clone)]
pub enum Guard {
    Any,
    Type(BaseType),
    Family(Family),
    Predicate(Predicate),
}

impl Guard {
    /// Raccourci pour une garde par prédicat
    pub fn predicate(description: &str, test: impl Fn(&Value) -> bool + 'static) -> Self {
        Guard::Predicate(Predicate::new(description, test))
    }

    /// La valeur satisfait-elle la garde ?
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Guard::Any => true,
            // Un Int est accepté là où un Float est attendu
            Guard::Type(BaseType::Float) => matches!(value, Value::Float(_) | Value::Int(_)),
            Guard::Type(ty) => value.get_type() == *ty,
            Guard::Family(family) => value
                .as_instance()
                .map(|inst| inst.is_family(family))
                .unwrap_or(false),
            Guard::Predicate(p) => p.test(value),
        }
    }
}

impl From<BaseType> for Guard {
    fn from(ty: BaseType) -> Self {
        Guard::Type(ty)
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Any => write!(f, "Any"),
            Guard::Type(ty) => write!(f, "{}", ty),
            Guard::Family(family) => write!(f, "{}", family.name()),
            Guard::Predicate(p) => write!(f, "{}", p.description()),
        }
    }
}
