// =============================================================================
// INSTANCE — Une valeur immuable d'un variant
// =============================================================================
//
// Une instance est étiquetée par EXACTEMENT un variant et par la famille
// à travers laquelle elle a été construite. Ses champs sont gelés :
// aucune réaffectation n'est possible après construction.
//
// Les opérations ne sont PAS copiées dans l'instance : elles sont
// résolues à l'appel, à travers la famille. Une opération installée
// après coup devient donc disponible sur les instances existantes.
//
// PROFONDEUR : une liste de 100 000 éléments est une chaîne de 100 000
// instances imbriquées. L'égalité, l'affichage et la destruction sont
// itératifs, jamais récursifs, pour ne pas dépendre de la pile native.
//
// =============================================================================

use std::fmt;
use std::rc::Rc;

use super::error::AdtError;
use super::family::{Family, Variant};
use super::fields::Fields;
use super::typeside::{self, Value};

struct InstanceInner {
    family: Family,
    variant: Rc<Variant>,
    fields: Fields,
}

/// Instance immuable. Cloner partage la même valeur.
#[derive(Clone)]
pub struct Instance(Rc<InstanceInner>);

impl Instance {
    /// Gèle des champs déjà validés
    pub(crate) fn freeze(family: Family, variant: Rc<Variant>, fields: Fields) -> Self {
        Instance(Rc::new(InstanceInner {
            family,
            variant,
            fields,
        }))
    }

    /// Famille à travers laquelle l'instance a été construite
    pub fn family(&self) -> &Family {
        &self.0.family
    }

    pub fn variant(&self) -> &Rc<Variant> {
        &self.0.variant
    }

    pub fn variant_name(&self) -> &str {
        self.0.variant.name()
    }

    pub fn fields(&self) -> &Fields {
        &self.0.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.fields.get(field)
    }

    /// Appartenance à une famille : vraie aussi pour les familles ancêtres
    pub fn is_family(&self, family: &Family) -> bool {
        self.0.family.descends_from(family.id())
    }

    pub fn is_variant(&self, variant: &Variant) -> bool {
        self.0.variant.tag() == variant.tag()
    }

    /// Toute mutation est refusée : les champs sont figés à la construction.
    pub fn set(&self, field: &str, _value: impl Into<Value>) -> Result<(), AdtError> {
        if !self.0.variant.has_field(field) {
            return Err(AdtError::UnknownField {
                variant: self.variant_name().to_string(),
                field: field.to_string(),
            });
        }
        Err(AdtError::Immutable {
            variant: self.variant_name().to_string(),
            field: field.to_string(),
        })
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Instance {
    /// Égalité structurelle, parcourue avec une liste de travail
    fn eq(&self, other: &Self) -> bool {
        let mut work = vec![(self.clone(), other.clone())];
        while let Some((a, b)) = work.pop() {
            if a.ptr_eq(&b) {
                continue;
            }
            if a.variant().tag() != b.variant().tag() || a.fields().len() != b.fields().len() {
                return false;
            }
            for ((na, va), (nb, vb)) in a.fields().iter().zip(b.fields().iter()) {
                if na != nb {
                    return false;
                }
                match (va, vb) {
                    (Value::Data(x), Value::Data(y)) => work.push((x.clone(), y.clone())),
                    _ => {
                        if va != vb {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

impl Drop for InstanceInner {
    fn drop(&mut self) {
        let mut pending = self.fields.drain_values();
        while let Some(value) = pending.pop() {
            match value {
                Value::Data(inst) => {
                    // Seul le dernier propriétaire démonte la sous-structure
                    if let Ok(mut inner) = Rc::try_unwrap(inst.0) {
                        pending.extend(inner.fields.drain_values());
                    }
                }
                Value::List(items) => pending.extend(items),
                _ => {}
            }
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        typeside::write_pending(f, typeside::Pending::Instance(self))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.family().name(), self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::family::{FamilyDecl, FieldSpec, VariantDecl};
    use crate::core::fields::FieldInput;
    use crate::core::typeside::BaseType;

    fn point() -> Family {
        let mut d = FamilyDecl::new("Point");
        d.variant(
            "Point2D",
            VariantDecl::new()
                .field("x", BaseType::Int)
                .field("y", BaseType::Int),
        );
        d.define().unwrap()
    }

    fn peano() -> Family {
        let mut d = FamilyDecl::new("Peano");
        d.singleton("Zero")
         .variant("Succ", VariantDecl::new().field("pred", FieldSpec::SelfRef));
        d.define().unwrap()
    }

    fn nat(family: &Family, n: usize) -> Instance {
        let mut current = family.singleton("Zero").unwrap();
        for _ in 0..n {
            current = family
                .construct("Succ", FieldInput::positional([Value::Data(current)]))
                .unwrap();
        }
        current
    }

    #[test]
    fn test_set_is_rejected() {
        let p = point();
        let pt = p.construct("Point2D", FieldInput::named([("x", 3), ("y", 4)])).unwrap();
        let err = pt.set("x", 10).unwrap_err();
        assert!(matches!(err, AdtError::Immutable { .. }));
        assert_eq!(pt.get("x"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_set_unknown_field() {
        let p = point();
        let pt = p.construct("Point2D", FieldInput::positional([1, 2])).unwrap();
        assert!(matches!(pt.set("z", 0), Err(AdtError::UnknownField { .. })));
    }

    #[test]
    fn test_capability_checks() {
        let p = peano();
        let other = point();
        let zero = p.singleton("Zero").unwrap();
        assert!(zero.is_family(&p));
        assert!(!zero.is_family(&other));
        assert!(zero.is_variant(&p.variant("Zero").unwrap()));
        assert!(!zero.is_variant(&p.variant("Succ").unwrap()));
    }

    #[test]
    fn test_structural_equality() {
        let p = peano();
        assert_eq!(nat(&p, 5), nat(&p, 5));
        assert_ne!(nat(&p, 5), nat(&p, 6));
    }

    #[test]
    fn test_deep_equality_and_drop() {
        let p = peano();
        let a = nat(&p, 50_000);
        let b = nat(&p, 50_000);
        assert!(a == b);
        drop(a);
        drop(b);
    }

    #[test]
    fn test_display() {
        let p = point();
        let pt = p.construct("Point2D", FieldInput::positional([1, 2])).unwrap();
        assert_eq!(format!("{}", pt), "Point2D(x: 1, y: 2)");
        assert_eq!(format!("{}", nat(&peano(), 2)), "Succ(pred: Succ(pred: Zero))");
        assert_eq!(format!("{:?}", pt), "Point::Point2D(x: 1, y: 2)");
    }

    #[test]
    fn test_deep_display() {
        let deep = nat(&peano(), 100_000);
        let shown = format!("{}", deep);
        assert!(shown.starts_with("Succ(pred: Succ(pred: "));
        assert!(shown.ends_with("Zero))"));
        assert_eq!(shown.matches("Succ").count(), 100_000);
        let debugged = format!("{:?}", Value::Data(deep));
        assert!(debugged.starts_with("Data(Peano::Succ("));
    }
}
