// =============================================================================
// FOLD — Catamorphisme : consommation ascendante d'une instance
// =============================================================================
//
// Un fold associe un HANDLER à chaque variant :
//
//   toValue =
//     Zero              → 0
//     Succ { pred }     → pred + 1     ← `pred` est DÉJÀ le résultat du
//                                        fold sur le sous-terme
//
// Les champs récursifs sont repliés AVANT le handler parent (post-ordre).
// Le parcours utilise la liste de travail du pilote, jamais la pile native.
//
// COMPLÉTUDE : à l'installation, chaque variant visible (hérité + local)
// doit avoir un handler, sauf si un joker est présent. Les variants des
// familles enfants déjà définies comptent aussi. Un trou est une erreur
// de déclaration immédiate, pas une erreur d'appel.
//
// EXTENSION : sous un nom hérité, seuls les nouveaux variants exigent un
// handler. Un handler redéclaré pour un variant hérité est soit :
//   - un remplacement complet         Handler::new(|champs| ..)
//   - une surcharge avec le parent    Handler::with_parent(|parent, champs| ..)
//     composée en new(résultatParent, champs)
//
// =============================================================================

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::error::{AdtError, DeclarationError};
use super::family::{ExtensionMode, Family, VariantTag};
use super::fields::Fields;
use super::operation::{self, Operation, OperationKind, Signature};
use super::transformer::{CtorTransform, FoldFn, Transformer};
use super::typeside::{Guard, Value};

/// Handler avec accès au résultat du handler parent
pub type OverrideFn = Rc<dyn Fn(Value, &Fields) -> Result<Value, AdtError>>;

/// Handler déclaré pour un variant (ou pour le joker).
#[derive(Clone)]
pub enum Handler {
    /// Remplacement complet
    Replace(FoldFn),
    /// Surcharge : reçoit le résultat du handler hérité
    Override(OverrideFn),
}

impl Handler {
    pub fn new(f: impl Fn(&Fields) -> Result<Value, AdtError> + 'static) -> Self {
        Handler::Replace(Rc::new(f))
    }

    pub fn with_parent(f: impl Fn(Value, &Fields) -> Result<Value, AdtError> + 'static) -> Self {
        Handler::Override(Rc::new(f))
    }

    /// Compile le handler. Une surcharge exige un handler parent.
    fn compile(self, parent: Option<&FoldFn>, operation: &str, variant: &str) -> Result<FoldFn, AdtError> {
        match self {
            Handler::Replace(f) => Ok(f),
            Handler::Override(g) => {
                let parent = parent.cloned().ok_or_else(|| DeclarationError::NothingToOverride {
                    operation: operation.to_string(),
                    variant: variant.to_string(),
                })?;
                Ok(Rc::new(move |fields: &Fields| {
                    let inherited = parent(fields)?;
                    g(inherited, fields)
                }))
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Replace(_) => write!(f, "Handler::Replace"),
            Handler::Override(_) => write!(f, "Handler::Override"),
        }
    }
}

/// Déclaration d'un fold.
#[derive(Debug, Clone)]
pub struct FoldDecl {
    signature: Signature,
    cases: Vec<(String, Handler)>,
    wildcard: Option<Handler>,
}

impl FoldDecl {
    /// Fold dont le résultat doit satisfaire `output`
    pub fn new(output: impl Into<Guard>) -> Self {
        FoldDecl {
            signature: Signature::output(output),
            cases: Vec::new(),
            wildcard: None,
        }
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn case(mut self, variant: &str, handler: Handler) -> Self {
        self.cases.push((variant.to_string(), handler));
        self
    }

    /// Raccourci pour `case(variant, Handler::new(f))`
    pub fn on(self, variant: &str, f: impl Fn(&Fields) -> Result<Value, AdtError> + 'static) -> Self {
        self.case(variant, Handler::new(f))
    }

    /// Handler des variants sans handler explicite
    pub fn wildcard(mut self, handler: Handler) -> Self {
        self.wildcard = Some(handler);
        self
    }
}

impl Family {
    /// Installe un fold, appelable ensuite par `Instance::call(name, &[])`.
    pub fn install_fold(&self, name: &str, decl: FoldDecl) -> Result<Family, AdtError> {
        let inherited = operation::prepare_install(self, name, OperationKind::Fold)?;
        let parent_ctor = inherited
            .as_ref()
            .and_then(|op| op.transformer().ctor().cloned())
            .unwrap_or_default();

        let mut handlers: HashMap<VariantTag, FoldFn> = parent_ctor.handlers().clone();
        let mut overridden = Vec::new();
        let mut seen: Vec<VariantTag> = Vec::new();

        for (vname, handler) in decl.cases {
            let variant = self.variant(&vname).ok_or_else(|| DeclarationError::UnknownVariant {
                family: self.name().to_string(),
                variant: vname.clone(),
            })?;
            let tag = variant.tag();
            if seen.contains(&tag) {
                return Err(DeclarationError::DuplicateVariant {
                    family: format!("{}.{}", self.name(), name),
                    variant: vname,
                }
                .into());
            }
            seen.push(tag);

            let parent = parent_ctor.handler_for(tag);
            // Le joker hérité ne fait pas d'un nouveau variant une surcharge
            if inherited.is_some() && parent_ctor.handlers().contains_key(&tag) {
                overridden.push(vname.clone());
            }
            let compiled = handler.compile(parent, name, &vname)?;
            handlers.insert(tag, compiled);
        }

        let wildcard = match decl.wildcard {
            Some(handler) => Some(handler.compile(parent_ctor.wildcard(), name, "_")?),
            None => parent_ctor.wildcard().cloned(),
        };
        let ctor = CtorTransform::new(handlers, wildcard);

        // Complétude contre l'ensemble des étiquettes connu maintenant,
        // variants des enfants déjà définis compris
        let inheritors = self.inheritors(name);
        let variants = self
            .variants()
            .into_iter()
            .chain(inheritors.iter().flat_map(|child| child.own_variants()));
        for variant in variants {
            if !ctor.covers(variant.tag()) {
                return Err(DeclarationError::MissingHandler {
                    operation: name.to_string(),
                    variant: variant.name().to_string(),
                }
                .into());
            }
        }

        let mode = inherited.as_ref().map(|_| {
            if overridden.is_empty() {
                ExtensionMode::Extend
            } else {
                ExtensionMode::Override { variants: overridden }
            }
        });
        let op = Operation::new(name, OperationKind::Fold, decl.signature, self, Transformer::from_ctor(ctor));
        Ok(operation::register(self, op, mode))
    }
}
