// =============================================================================
// VALIDATE — Gardes de champs et invariants d'enregistrement
// =============================================================================
//
// Toute instance passe par le même chemin de construction, qu'elle soit
// construite à la main, produite par un unfold ou reconstruite par un map :
//
//   1. order_input  → nommé ou positionnel → champs dans l'ordre déclaré
//                     (champ inconnu, manquant, mauvaise arité : rejet)
//   2. check_fields → chaque garde, dans l'ordre déclaré
//                     → PUIS l'invariant sur la table complète
//
// L'invariant n'est jamais évalué si une garde a échoué : il peut donc
// supposer des champs bien typés.
//
// =============================================================================

use std::rc::Rc;

use super::error::AdtError;
use super::family::{FieldSpec, Variant};
use super::fields::{FieldInput, Fields};
use super::typeside::Value;

/// Remet une entrée de constructeur dans l'ordre déclaré du variant.
pub(crate) fn order_input(variant: &Rc<Variant>, input: FieldInput) -> Result<Fields, AdtError> {
    let mut fields = Fields::new();
    match input {
        FieldInput::Named(entries) => {
            for (name, _) in &entries {
                if !variant.has_field(name) {
                    return Err(AdtError::UnknownField {
                        variant: variant.name().to_string(),
                        field: name.clone(),
                    });
                }
            }
            for (name, _) in variant.fields() {
                // La dernière occurrence d'un nom l'emporte
                let value = entries
                    .iter()
                    .rev()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| AdtError::FieldType {
                        variant: variant.name().to_string(),
                        field: name.clone(),
                        received: "absent".to_string(),
                        guard: spec_of(variant, name),
                    })?;
                fields.insert(name, value);
            }
        }
        FieldInput::Positional(values) => {
            if values.len() != variant.fields().len() {
                return Err(AdtError::Arity {
                    variant: variant.name().to_string(),
                    expected: variant.fields().len(),
                    received: values.len(),
                });
            }
            for ((name, _), value) in variant.fields().iter().zip(values) {
                fields.insert(name, value);
            }
        }
    }
    Ok(fields)
}

/// Vérifie les gardes puis l'invariant.
pub(crate) fn check_fields(variant: &Variant, fields: &Fields) -> Result<(), AdtError> {
    for (name, spec) in variant.fields() {
        check_field(variant, fields, name, spec)?;
    }

    if let Some(invariant) = variant.invariant() {
        if !invariant.holds(fields) {
            let snapshot: Vec<String> = fields
                .iter()
                .map(|(n, v)| format!("{}: {}", n, summary(v)))
                .collect();
            return Err(AdtError::InvariantViolation {
                variant: variant.name().to_string(),
                predicate: invariant.description().to_string(),
                snapshot: format!("{{{}}}", snapshot.join(", ")),
            });
        }
    }
    Ok(())
}

/// Vérifie les seules gardes non récursives : aux positions récursives
/// d'une couche générée se trouvent encore des graines.
pub(crate) fn check_guards(variant: &Variant, fields: &Fields) -> Result<(), AdtError> {
    for (name, spec) in variant.fields() {
        if !spec.is_recursive() {
            check_field(variant, fields, name, spec)?;
        }
    }
    Ok(())
}

fn check_field(variant: &Variant, fields: &Fields, name: &str, spec: &FieldSpec) -> Result<(), AdtError> {
    let value = fields.get(name).ok_or_else(|| AdtError::FieldType {
        variant: variant.name().to_string(),
        field: name.to_string(),
        received: "absent".to_string(),
        guard: spec.to_string(),
    })?;
    let accepted = match spec {
        FieldSpec::Guard(guard) => guard.check(value),
        FieldSpec::SelfRef => value
            .as_instance()
            .map(|inst| inst.family().descends_from(variant.declared_in()))
            .unwrap_or(false),
        FieldSpec::Param(_) => true,
    };
    if !accepted {
        return Err(AdtError::FieldType {
            variant: variant.name().to_string(),
            field: name.to_string(),
            received: summary(value),
            guard: match spec {
                FieldSpec::SelfRef => variant.family_name().to_string(),
                other => other.to_string(),
            },
        });
    }
    Ok(())
}

/// Résumé court d'une valeur pour les diagnostics (pas de descente récursive)
pub(crate) fn summary(value: &Value) -> String {
    match value {
        Value::Data(inst) if inst.fields().is_empty() => {
            format!("{}::{}", inst.family().name(), inst.variant_name())
        }
        Value::Data(inst) => format!("{}::{}(..)", inst.family().name(), inst.variant_name()),
        Value::List(items) => format!("[{} éléments]", items.len()),
        Value::Codata(obs) => format!("{}", obs),
        other => format!("{}", other),
    }
}

fn spec_of(variant: &Variant, field: &str) -> String {
    variant
        .field_spec(field)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "?".to_string())
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::family::{Family, FamilyDecl, VariantDecl};
    use crate::core::typeside::{BaseType, Guard};
    use std::cell::Cell;

    fn rectangle() -> Family {
        let mut d = FamilyDecl::new("Rectangle");
        d.variant(
            "Rect",
            VariantDecl::new()
                .field("width", BaseType::Int)
                .field("height", BaseType::Int)
                .field("area", BaseType::Int)
                .invariant("area = width * height", |f| {
                    match (f.int("width"), f.int("height"), f.int("area")) {
                        (Ok(w), Ok(h), Ok(a)) => w * h == a,
                        _ => false,
                    }
                }),
        );
        d.define().unwrap()
    }

    #[test]
    fn test_invariant_holds() {
        let r = rectangle();
        let ok = r.construct("Rect", FieldInput::named([("width", 5), ("height", 10), ("area", 50)]));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_invariant_violation() {
        let r = rectangle();
        let err = r
            .construct("Rect", FieldInput::named([("width", 5), ("height", 10), ("area", 100)]))
            .unwrap_err();
        match err {
            AdtError::InvariantViolation { variant, predicate, snapshot } => {
                assert_eq!(variant, "Rect");
                assert_eq!(predicate, "area = width * height");
                assert!(snapshot.contains("area: 100"));
            }
            other => panic!("erreur inattendue : {:?}", other),
        }
    }

    #[test]
    fn test_guard_before_invariant() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let mut d = FamilyDecl::new("Counted");
        d.variant(
            "C",
            VariantDecl::new()
                .field("n", BaseType::Int)
                .invariant("jamais appelé sur un mauvais type", move |_| {
                    seen.set(seen.get() + 1);
                    true
                }),
        );
        let fam = d.define().unwrap();

        let err = fam.construct("C", FieldInput::named([("n", "pas un entier")])).unwrap_err();
        assert!(matches!(err, AdtError::FieldType { ref field, .. } if field == "n"));
        assert_eq!(calls.get(), 0);

        fam.construct("C", FieldInput::positional([1])).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_missing_and_unknown_fields() {
        let r = rectangle();
        let missing = r.construct("Rect", FieldInput::named([("width", 5), ("height", 10)]));
        assert!(matches!(missing, Err(AdtError::FieldType { ref received, .. }) if received == "absent"));

        let unknown = r.construct("Rect", FieldInput::named([("depth", 1)]));
        assert!(matches!(unknown, Err(AdtError::UnknownField { .. })));

        let arity = r.construct("Rect", FieldInput::positional([1, 2]));
        assert!(matches!(arity, Err(AdtError::Arity { expected: 3, received: 2, .. })));
    }

    #[test]
    fn test_self_ref_guard() {
        let mut d = FamilyDecl::new("Peano");
        d.singleton("Zero")
         .variant("Succ", VariantDecl::new().field("pred", FieldSpec::SelfRef));
        let p = d.define().unwrap();

        let err = p.construct("Succ", FieldInput::positional([3])).unwrap_err();
        match err {
            AdtError::FieldType { guard, received, .. } => {
                assert_eq!(guard, "Peano");
                assert_eq!(received, "3");
            }
            other => panic!("erreur inattendue : {:?}", other),
        }
    }

    #[test]
    fn test_check_guards_skips_seeds() {
        let mut d = FamilyDecl::new("List");
        d.singleton("Nil").variant(
            "Cons",
            VariantDecl::new()
                .field("head", BaseType::Int)
                .field("tail", FieldSpec::SelfRef),
        );
        let l = d.define().unwrap();
        let cons = l.variant("Cons").unwrap();

        // `tail` porte une graine, pas une instance
        let seeded = order_input(&cons, FieldInput::positional([1, 2])).unwrap();
        assert!(check_guards(&cons, &seeded).is_ok());
        assert!(check_fields(&cons, &seeded).is_err());

        let bad = order_input(&cons, FieldInput::positional([Value::from("un"), Value::Int(2)])).unwrap();
        assert!(matches!(check_guards(&cons, &bad), Err(AdtError::FieldType { ref field, .. }) if field == "head"));
    }

    #[test]
    fn test_predicate_guard_message() {
        let mut d = FamilyDecl::new("Positive");
        d.variant(
            "P",
            VariantDecl::new().field("n", Guard::predicate("Int > 0", |v| v.as_int().map_or(false, |i| i > 0))),
        );
        let fam = d.define().unwrap();
        let err = fam.construct("P", FieldInput::positional([-2])).unwrap_err();
        assert!(format!("{}", err).contains("Int > 0"));
    }
}
