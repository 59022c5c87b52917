// =============================================================================
// TRANSFORMER — La représentation unique de toutes les opérations
// =============================================================================
//
// Toute opération est compilée en un transformateur à quatre facettes,
// toutes optionnelles :
//
//   generator  graine → couche (variant + champs, sous-graines aux
//              positions récursives)                        ← unfold
//   ctor       handler par variant : couche repliée → valeur ← fold
//   param      fonction par paramètre de type               ← map
//   atom       repli pour les champs feuilles ordinaires    ← map
//
// Un fold n'a que `ctor`, un unfold que `generator`, un map que `param`
// (et éventuellement `atom`). La FUSION compose les facettes :
//
//   unfold ; map₁ ; map₂ ; fold
//     → generator = celui de l'unfold
//     → param     = map₁ puis map₂, paramètre par paramètre
//     → ctor      = celui du fold
//
// Le pilote (eval.rs) exécute n'importe quel transformateur de la même
// façon : générer ou projeter une couche, appliquer param/atom, descendre
// dans les positions récursives, puis replier avec ctor (ou reconstruire
// une instance si ctor est absent). Une fusion ne matérialise donc jamais
// l'instance intermédiaire.
//
// =============================================================================

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::error::AdtError;
use super::eval::Layer;
use super::family::{Family, Variant, VariantTag};
use super::fields::Fields;
use super::typeside::Value;
use super::unfold::StandIn;
use super::validate;

/// Handler de fold compilé : champs (récursifs déjà repliés) → valeur
pub type FoldFn = Rc<dyn Fn(&Fields) -> Result<Value, AdtError>>;

/// Cas d'unfold : graine → champs, ou None si le cas ne s'applique pas
pub type CaseFn = Rc<dyn Fn(&Value, &StandIn) -> Result<Option<Fields>, AdtError>>;

/// Transformation ponctuelle (valeur, arguments supplémentaires) → valeur
pub type ParamFn = Rc<dyn Fn(&Value, &[Value]) -> Result<Value, AdtError>>;

#[derive(Clone)]
pub(crate) struct UnfoldCase {
    pub variant: Rc<Variant>,
    pub case: CaseFn,
}

/// Facette `generator` : les cas d'un unfold, dans l'ordre de déclaration.
#[derive(Clone)]
pub struct Generator {
    operation: String,
    cases: Vec<UnfoldCase>,
}

impl Generator {
    pub(crate) fn new(operation: &str, cases: Vec<UnfoldCase>) -> Self {
        Generator {
            operation: operation.to_string(),
            cases,
        }
    }

    pub(crate) fn cases(&self) -> &[UnfoldCase] {
        &self.cases
    }

    /// Variants couverts, dans l'ordre d'évaluation
    pub fn variants(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.variant.name()).collect()
    }

    /// Le premier cas qui rend des champs gagne.
    pub(crate) fn generate(&self, family: &Family, seed: &Value) -> Result<Layer, AdtError> {
        for c in &self.cases {
            let ctor = StandIn::new(Rc::clone(&c.variant));
            if let Some(fields) = (c.case)(seed, &ctor)? {
                let fields = if fields.names().eq(c.variant.fields().iter().map(|(n, _)| n.as_str())) {
                    fields
                } else {
                    validate::order_input(&c.variant, fields.into())?
                };
                return Ok(Layer {
                    family: family.clone(),
                    variant: Rc::clone(&c.variant),
                    fields,
                });
            }
        }
        Err(AdtError::Exhaustiveness {
            operation: self.operation.clone(),
            seed: validate::summary(seed),
        })
    }
}

/// Facette `ctor` : un handler par étiquette de variant, plus un joker.
#[derive(Clone, Default)]
pub struct CtorTransform {
    handlers: HashMap<VariantTag, FoldFn>,
    wildcard: Option<FoldFn>,
}

impl CtorTransform {
    pub(crate) fn new(handlers: HashMap<VariantTag, FoldFn>, wildcard: Option<FoldFn>) -> Self {
        CtorTransform { handlers, wildcard }
    }

    pub fn covers(&self, tag: VariantTag) -> bool {
        self.wildcard.is_some() || self.handlers.contains_key(&tag)
    }

    pub fn has_wildcard(&self) -> bool {
        self.wildcard.is_some()
    }

    /// Handler explicite, sinon le joker
    pub(crate) fn handler_for(&self, tag: VariantTag) -> Option<&FoldFn> {
        self.handlers.get(&tag).or(self.wildcard.as_ref())
    }

    pub(crate) fn handlers(&self) -> &HashMap<VariantTag, FoldFn> {
        &self.handlers
    }

    pub(crate) fn wildcard(&self) -> Option<&FoldFn> {
        self.wildcard.as_ref()
    }
}

/// Facette `param` : une fonction par paramètre de type.
#[derive(Clone, Default)]
pub struct ParamTransform {
    transforms: IndexMap<String, ParamFn>,
}

impl ParamTransform {
    pub(crate) fn new(transforms: IndexMap<String, ParamFn>) -> Self {
        ParamTransform { transforms }
    }

    pub fn params(&self) -> Vec<&str> {
        self.transforms.keys().map(|k| k.as_str()).collect()
    }

    pub(crate) fn get(&self, param: &str) -> Option<&ParamFn> {
        self.transforms.get(param)
    }

    /// Compose paramètre par paramètre : `self` d'abord, puis `next`
    pub(crate) fn then(&self, next: &ParamTransform) -> ParamTransform {
        let mut out = self.transforms.clone();
        for (param, g) in &next.transforms {
            let composed = match out.get(param) {
                Some(f) => compose(Rc::clone(f), Rc::clone(g)),
                None => Rc::clone(g),
            };
            out.insert(param.clone(), composed);
        }
        ParamTransform { transforms: out }
    }
}

fn compose(f: ParamFn, g: ParamFn) -> ParamFn {
    Rc::new(move |value: &Value, args: &[Value]| {
        let mid = f(value, args)?;
        g(&mid, args)
    })
}

/// Le transformateur complet.
#[derive(Clone, Default)]
pub struct Transformer {
    generator: Option<Generator>,
    ctor: Option<CtorTransform>,
    param: Option<ParamTransform>,
    atom: Option<ParamFn>,
}

impl Transformer {
    pub(crate) fn from_generator(generator: Generator) -> Self {
        Transformer {
            generator: Some(generator),
            ..Default::default()
        }
    }

    pub(crate) fn from_ctor(ctor: CtorTransform) -> Self {
        Transformer {
            ctor: Some(ctor),
            ..Default::default()
        }
    }

    pub(crate) fn from_params(param: ParamTransform, atom: Option<ParamFn>) -> Self {
        Transformer {
            param: Some(param),
            atom,
            ..Default::default()
        }
    }

    pub fn generator(&self) -> Option<&Generator> {
        self.generator.as_ref()
    }

    pub fn ctor(&self) -> Option<&CtorTransform> {
        self.ctor.as_ref()
    }

    pub fn params(&self) -> Option<&ParamTransform> {
        self.param.as_ref()
    }

    pub(crate) fn atom(&self) -> Option<&ParamFn> {
        self.atom.as_ref()
    }

    /// Noms des facettes présentes
    pub fn facets(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.generator.is_some() {
            out.push("generator");
        }
        if self.ctor.is_some() {
            out.push("ctor");
        }
        if self.param.is_some() {
            out.push("param");
        }
        if self.atom.is_some() {
            out.push("atom");
        }
        out
    }

    /// Fusionne des étapes déjà ordonnées (unfold, maps, fold) en un seul
    /// jeu de facettes. L'ordre et les cardinalités sont vérifiés par merge.rs.
    pub(crate) fn fuse(stages: &[&Transformer]) -> Transformer {
        let mut out = Transformer::default();
        for stage in stages {
            if let Some(g) = &stage.generator {
                out.generator = Some(g.clone());
            }
            if let Some(p) = &stage.param {
                out.param = Some(match &out.param {
                    Some(prev) => prev.then(p),
                    None => p.clone(),
                });
            }
            out.atom = match (out.atom.take(), stage.atom.clone()) {
                (Some(f), Some(g)) => Some(compose(f, g)),
                (f, g) => f.or(g),
            };
            if let Some(c) = &stage.ctor {
                out.ctor = Some(c.clone());
            }
        }
        out
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transformer{:?}", self.facets())
    }
}
