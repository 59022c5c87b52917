// =============================================================================
// MAP — Foncteur : transformer les paramètres de type, garder la forme
// =============================================================================
//
//   List<T>.map(T ↦ T * 2) : Cons(1, Cons(2, Nil)) → Cons(2, Cons(4, Nil))
//
// Pour chaque champ de chaque couche :
//   - typé par un paramètre transformé → remplacé par f(valeur, args...)
//   - récursif                         → reçoit le même map (mêmes args)
//   - autre                            → inchangé (ou `atoms` s'il est donné)
//
// Le résultat est une NOUVELLE instance, reconstruite par le chemin de
// construction habituel : gardes et invariant sont donc revérifiés.
// Sans champ paramétré, le map est l'identité structurelle.
//
// =============================================================================

use std::rc::Rc;

use indexmap::IndexMap;

use super::error::{AdtError, DeclarationError};
use super::family::{ExtensionMode, Family};
use super::operation::{self, Operation, OperationKind, Signature};
use super::transformer::{ParamFn, ParamTransform, Transformer};
use super::typeside::Value;

/// Déclaration d'un map.
#[derive(Clone, Default)]
pub struct MapDecl {
    params: IndexMap<String, ParamFn>,
    atoms: Option<ParamFn>,
}

impl MapDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transformation des champs typés par le paramètre `name`
    pub fn param(
        mut self,
        name: &str,
        f: impl Fn(&Value, &[Value]) -> Result<Value, AdtError> + 'static,
    ) -> Self {
        self.params.insert(name.to_string(), Rc::new(f));
        self
    }

    /// Transformation des champs ordinaires (ni paramétrés, ni récursifs)
    pub fn atoms(mut self, f: impl Fn(&Value, &[Value]) -> Result<Value, AdtError> + 'static) -> Self {
        self.atoms = Some(Rc::new(f));
        self
    }
}

impl Family {
    /// Installe un map, appelable par `Instance::call(name, &[args...])`.
    pub fn install_map(&self, name: &str, decl: MapDecl) -> Result<Family, AdtError> {
        let inherited = operation::prepare_install(self, name, OperationKind::Map)?;

        for param in decl.params.keys() {
            if !self.has_type_param(param) {
                return Err(DeclarationError::UnknownTypeParam {
                    family: self.name().to_string(),
                    param: param.clone(),
                }
                .into());
            }
        }

        // Les transformations héritées restent, celles redéclarées sont remplacées
        let mut transforms: IndexMap<String, ParamFn> = IndexMap::new();
        let mut atoms = None;
        if let Some(op) = &inherited {
            if let Some(pt) = op.transformer().params() {
                for p in pt.params() {
                    if let Some(f) = pt.get(p) {
                        transforms.insert(p.to_string(), Rc::clone(f));
                    }
                }
            }
            atoms = op.transformer().atom().cloned();
        }
        let overridden: Vec<String> = decl
            .params
            .keys()
            .filter(|p| transforms.contains_key(*p))
            .cloned()
            .collect();
        transforms.extend(decl.params);
        if decl.atoms.is_some() {
            atoms = decl.atoms;
        }

        let mode = inherited.as_ref().map(|_| {
            if overridden.is_empty() {
                ExtensionMode::Extend
            } else {
                ExtensionMode::Override { variants: overridden }
            }
        });
        let transformer = Transformer::from_params(ParamTransform::new(transforms), atoms);
        let op = Operation::new(name, OperationKind::Map, Signature::data(), self, transformer);
        Ok(operation::register(self, op, mode))
    }
}
