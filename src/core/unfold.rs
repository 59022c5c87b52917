// =============================================================================
// UNFOLD — Anamorphisme : d'une graine à une instance
// =============================================================================
//
// Un unfold est une liste ORDONNÉE de cas, un par variant :
//
//   FromValue(n) =
//     Zero : n <= 0 → {}
//     Succ : n > 0  → { pred: n - 1 }      ← n - 1 est une SOUS-GRAINE
//
// Les cas sont essayés dans l'ordre de déclaration ; le premier qui rend
// des champs gagne. Aux positions récursives, les valeurs rendues sont
// des graines, dépliées à leur tour par le pilote (eval.rs).
//
// Chaque cas reçoit un CONSTRUCTEUR DE SUBSTITUTION (StandIn) qui accepte
// les mêmes formes que la construction directe, nommée ou positionnelle.
//
// Aucun cas applicable → erreur d'exhaustivité. La terminaison reste à la
// charge de l'appelant : un unfold non productif s'arrête sur la borne de
// la liste de travail.
//
// =============================================================================

use std::rc::Rc;

use super::error::{AdtError, DeclarationError};
use super::family::{ExtensionMode, Family, Variant};
use super::fields::{FieldInput, Fields};
use super::operation::{self, Operation, OperationKind, Signature};
use super::transformer::{CaseFn, Generator, Transformer, UnfoldCase};
use super::typeside::Value;
use super::validate;

/// Constructeur de substitution passé aux cas d'unfold.
pub struct StandIn {
    variant: Rc<Variant>,
}

impl StandIn {
    pub(crate) fn new(variant: Rc<Variant>) -> Self {
        StandIn { variant }
    }

    pub fn variant_name(&self) -> &str {
        self.variant.name()
    }

    /// Champs nommés (les positions récursives portent des graines)
    pub fn named<K, V, I>(&self, entries: I) -> Result<Option<Fields>, AdtError>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        validate::order_input(&self.variant, FieldInput::named(entries)).map(Some)
    }

    /// Champs dans l'ordre déclaré
    pub fn positional<V, I>(&self, values: I) -> Result<Option<Fields>, AdtError>
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        validate::order_input(&self.variant, FieldInput::positional(values)).map(Some)
    }

    /// Pour un singleton
    pub fn unit(&self) -> Result<Option<Fields>, AdtError> {
        validate::order_input(&self.variant, FieldInput::empty()).map(Some)
    }
}

/// Déclaration d'un unfold.
#[derive(Clone)]
pub struct UnfoldDecl {
    signature: Signature,
    cases: Vec<(String, CaseFn)>,
}

impl UnfoldDecl {
    pub fn new(signature: Signature) -> Self {
        UnfoldDecl {
            signature,
            cases: Vec::new(),
        }
    }

    /// Ajoute un cas. Rendre `Ok(None)` passe au cas suivant.
    pub fn case(
        mut self,
        variant: &str,
        f: impl Fn(&Value, &StandIn) -> Result<Option<Fields>, AdtError> + 'static,
    ) -> Self {
        self.cases.push((variant.to_string(), Rc::new(f)));
        self
    }
}

impl Default for UnfoldDecl {
    fn default() -> Self {
        UnfoldDecl::new(Signature::data())
    }
}

impl Family {
    /// Installe un unfold, appelable ensuite par `Family::call(name, graine)`.
    ///
    /// Sous un nom hérité, les cas du parent sont conservés dans leur ordre ;
    /// un cas redéclaré pour le même variant remplace celui du parent, les
    /// autres s'ajoutent à la fin.
    pub fn install_unfold(&self, name: &str, decl: UnfoldDecl) -> Result<Family, AdtError> {
        let inherited = operation::prepare_install(self, name, OperationKind::Unfold)?;

        let mut cases: Vec<UnfoldCase> = inherited
            .as_ref()
            .and_then(|op| op.transformer().generator())
            .map(|g| g.cases().to_vec())
            .unwrap_or_default();
        let mut overridden = Vec::new();
        let mut seen = Vec::new();

        for (vname, case) in decl.cases {
            let variant = self.variant(&vname).ok_or_else(|| DeclarationError::UnknownVariant {
                family: self.name().to_string(),
                variant: vname.clone(),
            })?;
            if seen.contains(&variant.tag()) {
                return Err(DeclarationError::DuplicateVariant {
                    family: format!("{}.{}", self.name(), name),
                    variant: vname,
                }
                .into());
            }
            seen.push(variant.tag());
            match cases.iter().position(|c| c.variant.tag() == variant.tag()) {
                Some(i) => {
                    cases[i].case = case;
                    overridden.push(vname);
                }
                None => cases.push(UnfoldCase { variant, case }),
            }
        }

        if cases.is_empty() {
            return Err(DeclarationError::MissingHandler {
                operation: name.to_string(),
                variant: "(aucun cas)".to_string(),
            }
            .into());
        }

        let mode = inherited.as_ref().map(|_| {
            if overridden.is_empty() {
                ExtensionMode::Extend
            } else {
                ExtensionMode::Override { variants: overridden }
            }
        });
        let transformer = Transformer::from_generator(Generator::new(name, cases));
        let op = Operation::new(name, OperationKind::Unfold, decl.signature, self, transformer);
        Ok(operation::register(self, op, mode))
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::family::{FamilyDecl, FieldSpec, VariantDecl};
    use crate::core::typeside::BaseType;

    fn peano() -> Family {
        let mut d = FamilyDecl::new("Peano");
        d.singleton("Zero")
         .variant("Succ", VariantDecl::new().field("pred", FieldSpec::SelfRef));
        d.define().unwrap()
    }

    fn from_value() -> UnfoldDecl {
        UnfoldDecl::new(Signature::new(BaseType::Int, BaseType::Data))
            .case("Zero", |n, c| match n.as_int() {
                Some(i) if i <= 0 => c.unit(),
                _ => Ok(None),
            })
            .case("Succ", |n, c| match n.as_int() {
                Some(i) if i > 0 => c.named([("pred", i - 1)]),
                _ => Ok(None),
            })
    }

    fn depth(inst: &crate::core::instance::Instance) -> usize {
        let mut n = 0;
        let mut current = inst.clone();
        while let Some(Value::Data(pred)) = current.get("pred").cloned() {
            n += 1;
            current = pred;
        }
        n
    }

    #[test]
    fn test_unfold_peano() {
        let p = peano().install_unfold("FromValue", from_value()).unwrap();
        let three = p.call("FromValue", 3).unwrap().into_instance().unwrap();
        assert_eq!(three.variant_name(), "Succ");
        assert_eq!(depth(&three), 3);
    }

    #[test]
    fn test_first_case_wins() {
        let mut d = FamilyDecl::new("Choice");
        d.singleton("A").singleton("B");
        let f = d.define().unwrap();
        let f = f
            .install_unfold(
                "pick",
                UnfoldDecl::default()
                    .case("A", |_, c| c.unit())
                    .case("B", |_, c| c.unit()),
            )
            .unwrap();
        let picked = f.call("pick", 0).unwrap().into_instance().unwrap();
        assert_eq!(picked.variant_name(), "A");
    }

    #[test]
    fn test_exhaustiveness() {
        let p = peano()
            .install_unfold(
                "onlyZero",
                UnfoldDecl::default().case("Zero", |n, c| if n.as_int() == Some(0) { c.unit() } else { Ok(None) }),
            )
            .unwrap();
        let err = p.call("onlyZero", 5).unwrap_err();
        assert!(matches!(err, AdtError::Exhaustiveness { ref operation, .. } if operation == "onlyZero"));
    }

    #[test]
    fn test_positional_stand_in() {
        let p = peano()
            .install_unfold(
                "pos",
                UnfoldDecl::default()
                    .case("Zero", |n, c| if n.as_int() == Some(0) { c.unit() } else { Ok(None) })
                    .case("Succ", |n, c| c.positional([n.as_int().unwrap_or(0) - 1])),
            )
            .unwrap();
        let two = p.call("pos", 2).unwrap().into_instance().unwrap();
        assert_eq!(depth(&two), 2);
    }

    #[test]
    fn test_unknown_variant_in_case() {
        let err = peano()
            .install_unfold("bad", UnfoldDecl::default().case("Nope", |_, c| c.unit()))
            .unwrap_err();
        assert!(matches!(err, AdtError::Declaration(DeclarationError::UnknownVariant { .. })));
    }

    #[test]
    fn test_seed_guard() {
        let p = peano().install_unfold("FromValue", from_value()).unwrap();
        let err = p.call("FromValue", "trois").unwrap_err();
        assert!(matches!(err, AdtError::FieldType { ref field, .. } if field == "graine"));
    }

    #[test]
    fn test_extended_unfold_appends_cases() {
        let p = peano().install_unfold("FromValue", from_value()).unwrap();
        let mut d = FamilyDecl::extending("ExtendedPeano", &p);
        d.variant("Pred", VariantDecl::new().field("succ", FieldSpec::SelfRef));
        let e = d.define().unwrap();
        // Les négatifs deviennent des Pred ; le cas Zero hérité est redéclaré
        let e = e
            .install_unfold(
                "FromValue",
                UnfoldDecl::new(Signature::new(BaseType::Int, BaseType::Data))
                    .case("Zero", |n, c| if n.as_int() == Some(0) { c.unit() } else { Ok(None) })
                    .case("Pred", |n, c| match n.as_int() {
                        Some(i) if i < 0 => c.named([("succ", i + 1)]),
                        _ => Ok(None),
                    }),
            )
            .unwrap();

        let op = e.operation("FromValue").unwrap();
        assert_eq!(op.transformer().generator().unwrap().variants(), vec!["Zero", "Succ", "Pred"]);
        let minus_two = e.call("FromValue", -2).unwrap().into_instance().unwrap();
        assert_eq!(minus_two.variant_name(), "Pred");
        assert_eq!(
            e.extension().unwrap().operations.get("FromValue"),
            Some(&ExtensionMode::Override { variants: vec!["Zero".to_string()] })
        );
    }
}
