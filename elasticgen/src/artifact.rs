//! Generated artifacts and dependency accumulation.
//!
//! An [`Artifact`] is an ordered list of module definitions in which every module is defined
//! before any module instantiating it. Generators build artifacts with an [`Accumulator`]: each
//! submodule is requested under a [`Role`], generated depth-first, and merged before the parent's
//! own block is appended.
//!
//! Merging the same identity twice is allowed only if both definitions are identical; the first
//! one is kept. Differing definitions are a [`GenError::NameCollision`].

use itertools::Itertools;
use tracing::{debug, trace};

use crate::error::GenError;
use crate::ident::{InstanceId, Role};
use crate::vir;

/// One generated module definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    module: vir::Module,
    latency: u32,
}

impl Block {
    /// Module name.
    pub fn identity(&self) -> &str { &self.module.name }

    /// Module IR.
    pub fn module(&self) -> &vir::Module { &self.module }

    /// Number of cycles between an input transfer and the matching output transfer, when the
    /// output is not stalled. Zero for combinational units.
    pub fn latency(&self) -> u32 { self.latency }

    /// Rendered Verilog.
    pub fn text(&self) -> String { self.module.to_string() }
}

/// Ordered, dependency-first sequence of module definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    blocks: Vec<Block>,
    externals: Vec<String>,
}

impl Artifact {
    /// Blocks in definition order.
    pub fn blocks(&self) -> &[Block] { &self.blocks }

    /// Block of the requested unit, i.e. the last one.
    pub fn top(&self) -> Option<&Block> { self.blocks.last() }

    /// Block with the given identity.
    pub fn get(&self, identity: &str) -> Option<&Block> { self.blocks.iter().find(|block| block.identity() == identity) }

    /// Externally provided modules (vendor IP) referenced by the blocks.
    pub fn externals(&self) -> &[String] { &self.externals }

    /// Latency of the requested unit.
    pub fn latency(&self) -> u32 { self.top().map_or(0, Block::latency) }

    /// Whole artifact as Verilog text.
    pub fn text(&self) -> String { self.blocks.iter().map(Block::text).join("\n") }

    fn is_defined(&self, identity: &str) -> bool {
        self.get(identity).is_some() || self.externals.iter().any(|external| external == identity)
    }

    fn add_external(&mut self, identity: String) {
        if !self.externals.contains(&identity) {
            self.externals.push(identity);
        }
    }

    fn insert(&mut self, block: Block) -> Result<(), GenError> {
        match self.get(block.identity()) {
            Some(existing) if *existing == block => {
                trace!(identity = block.identity(), "deduplicated");
                Ok(())
            }
            Some(_) => Err(GenError::collision(block.identity())),
            None if self.externals.iter().any(|external| external == block.identity()) => {
                Err(GenError::collision(block.identity()))
            }
            None => {
                self.blocks.push(block);
                Ok(())
            }
        }
    }

    fn merge(&mut self, other: Artifact) -> Result<(), GenError> {
        for external in other.externals {
            if self.get(&external).is_some() {
                return Err(GenError::collision(external));
            }
            self.add_external(external);
        }
        for block in other.blocks {
            self.insert(block)?;
        }
        Ok(())
    }

    fn define(&mut self, block: Block) -> Result<(), GenError> {
        for referenced in block.module.instantiated_modules() {
            if referenced != block.identity() && !self.is_defined(referenced) {
                return Err(GenError::UnresolvedReference {
                    module: block.identity().to_string(),
                    referenced: referenced.to_string(),
                });
            }
        }
        self.insert(block)
    }
}

/// Submodule generated by [`Accumulator::require`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Identity of the submodule.
    pub id: InstanceId,
    /// Latency of the submodule.
    pub latency: u32,
}

impl Dependency {
    /// Module name to instantiate.
    pub fn name(&self) -> String { self.id.to_string() }
}

/// Collects the dependencies of one module, then the module itself.
#[derive(Debug)]
pub struct Accumulator {
    id: InstanceId,
    roles: Vec<Role>,
    artifact: Artifact,
}

impl Accumulator {
    /// Starts accumulating for the module `id`.
    pub fn new(id: InstanceId) -> Self { Self { id, roles: Vec::new(), artifact: Artifact::default() } }

    /// Identity of the module being generated.
    pub fn id(&self) -> &InstanceId { &self.id }

    /// Generates the submodule playing `role` and merges it before the parent.
    ///
    /// `generate` receives the derived identity and must define a module with exactly that name.
    /// Each role can be requested once per parent.
    pub fn require<F>(&mut self, role: Role, generate: F) -> Result<Dependency, GenError>
    where F: FnOnce(&InstanceId) -> Result<Artifact, GenError> {
        let id = self.id.child(role);
        if self.roles.contains(&role) {
            return Err(GenError::collision(&id));
        }
        self.roles.push(role);

        trace!(parent = %self.id, role = role.token(), "expanding submodule");
        let artifact = generate(&id)?;
        let latency = match artifact.top() {
            Some(top) if top.identity() == id.to_string() => top.latency(),
            _ => {
                return Err(GenError::UnresolvedReference {
                    module: self.id.to_string(),
                    referenced: id.to_string(),
                })
            }
        };
        self.artifact.merge(artifact)?;
        Ok(Dependency { id, latency })
    }

    /// Declares an externally provided module that the parent instantiates.
    pub fn external<S: Into<String>>(&mut self, identity: S) -> Result<(), GenError> {
        let identity = identity.into();
        if self.artifact.get(&identity).is_some() {
            return Err(GenError::collision(identity));
        }
        self.artifact.add_external(identity);
        Ok(())
    }

    /// Appends the parent module and returns the complete artifact.
    ///
    /// The module is renamed to the accumulator's identity.
    pub fn finish(self, mut module: vir::Module, latency: u32) -> Result<Artifact, GenError> {
        let Self { id, mut artifact, .. } = self;
        module.name = id.to_string();
        artifact.define(Block { module, latency })?;
        debug!(identity = %id, blocks = artifact.blocks.len(), latency, "generated");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vir::{ModuleInstantiation, ModuleItem, PortDeclaration};

    fn leaf(id: &InstanceId, width: usize) -> Result<Artifact, GenError> {
        let mut module = vir::Module::new(id.to_string());
        module.port_decls.push(PortDeclaration::input(width, "ins"));
        Accumulator::new(id.clone()).finish(module, 1)
    }

    fn instantiating(names: &[String]) -> vir::Module {
        let mut module = vir::Module::new("");
        for (i, name) in names.iter().enumerate() {
            module.module_items.push(ModuleItem::ModuleInstantiation(ModuleInstantiation::new(name, format!("u{}", i))));
        }
        module
    }

    #[test]
    fn dependencies_come_first() {
        let mut acc = Accumulator::new(InstanceId::new("top").unwrap());
        let inner = acc.require(Role::Inner, |id| leaf(id, 8)).unwrap();
        let buff = acc.require(Role::Buff, |id| leaf(id, 1)).unwrap();
        assert_eq!(inner.latency, 1);

        let artifact = acc.finish(instantiating(&[inner.name(), buff.name()]), 2).unwrap();
        let identities = artifact.blocks().iter().map(Block::identity).collect::<Vec<_>>();
        assert_eq!(identities, vec!["top_inner", "top_buff", "top"]);
        assert_eq!(artifact.latency(), 2);
    }

    #[test]
    fn role_is_requested_once() {
        let mut acc = Accumulator::new(InstanceId::new("top").unwrap());
        let _ = acc.require(Role::Inner, |id| leaf(id, 8)).unwrap();
        assert_eq!(
            acc.require(Role::Inner, |id| leaf(id, 8)),
            Err(GenError::NameCollision { identity: "top_inner".to_string() })
        );
    }

    #[test]
    fn identical_duplicates_are_deduplicated() {
        let shared = InstanceId::new("shared").unwrap();
        let mut acc = Accumulator::new(InstanceId::new("top").unwrap());
        let shared_a = shared.clone();
        let shared_b = shared.clone();
        let _ = acc
            .require(Role::Inner, move |id| {
                let mut acc = Accumulator::new(id.clone());
                acc.artifact.merge(leaf(&shared_a, 4)?)?;
                acc.finish(instantiating(&[shared_a.to_string()]), 0)
            })
            .unwrap();
        let _ = acc
            .require(Role::Buff, move |id| {
                let mut acc = Accumulator::new(id.clone());
                acc.artifact.merge(leaf(&shared_b, 4)?)?;
                acc.finish(instantiating(&[shared_b.to_string()]), 0)
            })
            .unwrap();
        let artifact = acc.finish(instantiating(&["top_inner".into(), "top_buff".into()]), 0).unwrap();
        assert_eq!(artifact.blocks().iter().filter(|block| block.identity() == "shared").count(), 1);
    }

    #[test]
    fn differing_duplicates_collide() {
        let shared = InstanceId::new("shared").unwrap();
        let mut artifact = leaf(&shared, 4).unwrap();
        assert_eq!(artifact.merge(leaf(&shared, 4).unwrap()), Ok(()));
        assert_eq!(
            artifact.merge(leaf(&shared, 5).unwrap()),
            Err(GenError::NameCollision { identity: "shared".to_string() })
        );
    }

    #[test]
    fn forward_references_are_rejected() {
        let acc = Accumulator::new(InstanceId::new("top").unwrap());
        assert_eq!(
            acc.finish(instantiating(&["missing".to_string()]), 0),
            Err(GenError::UnresolvedReference { module: "top".to_string(), referenced: "missing".to_string() })
        );

        let mut acc = Accumulator::new(InstanceId::new("top").unwrap());
        acc.external("FloatingPointAdder").unwrap();
        let artifact = acc.finish(instantiating(&["FloatingPointAdder".to_string()]), 0).unwrap();
        assert_eq!(artifact.externals(), ["FloatingPointAdder".to_string()]);
    }

    #[test]
    fn submodule_must_define_requested_identity() {
        let mut acc = Accumulator::new(InstanceId::new("top").unwrap());
        let other = InstanceId::new("other").unwrap();
        assert!(matches!(acc.require(Role::Inner, |_| leaf(&other, 1)), Err(GenError::UnresolvedReference { .. })));
    }

    #[test]
    fn failures_propagate() {
        let mut acc = Accumulator::new(InstanceId::new("top").unwrap());
        let result = acc.require(Role::Inner, |_| Err(GenError::invalid("size", "missing")));
        assert_eq!(result, Err(GenError::invalid("size", "missing")));
    }
}
