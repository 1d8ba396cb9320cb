//! Resolution of reference strings to entities within one artifact.
//!
//! Structural references are decomposed with [`Signature`] and materialized
//! as synthetic entities owned by the artifact. A synthetic entity's id is
//! reserved and recorded before any of its components are looked at, and
//! components are processed from an explicit worklist, so shared or repeated
//! components resolve to the entity already recorded instead of recursing.
//!
//! Everything else is looked up among the artifact's own declared entities
//! and the non-private types and members of its dependency closure. No match
//! falls back to the shared [`UnknownsRegistry`]; several matches in other
//! artifacts collapse into one DUPLICATE entity per artifact with a MATCHES
//! edge to each candidate.

use javagraph_core::entities::{
    ArtifactId, ArtifactKind, EntityId, EntityKind, EntityRecord, Location, RelationClass,
    RelationKind, RelationRecord,
};
use javagraph_core::{Result, Signature, WildcardBound};
use javagraph_storage::StoreSession;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

use crate::unknowns::UnknownsRegistry;

/// Resolved entity with the owner needed to classify relations to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub id: EntityId,
    pub artifact: ArtifactId,
    pub kind: EntityKind,
}

impl From<&EntityRecord> for EntityRef {
    fn from(entity: &EntityRecord) -> Self {
        Self {
            id: entity.id,
            artifact: entity.artifact,
            kind: entity.kind,
        }
    }
}

/// The artifact being resolved and the artifacts its lookups may reach
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    artifact: ArtifactId,
    unknowns: ArtifactId,
    /// Dependency closure without the artifact itself
    dependencies: Vec<ArtifactId>,
    /// JAVA_LIBRARY and PRIMITIVES artifacts
    libraries: HashSet<ArtifactId>,
}

impl ResolutionContext {
    /// Build the closure: every JAVA_LIBRARY artifact, the PRIMITIVES
    /// artifact and the transitive used-jar dependencies of `artifact`
    pub async fn load(
        session: &mut dyn StoreSession,
        artifact: ArtifactId,
        unknowns: ArtifactId,
    ) -> Result<Self> {
        let mut dependencies = Vec::new();
        let mut libraries = HashSet::new();
        for kind in [ArtifactKind::JavaLibrary, ArtifactKind::Primitives] {
            for library in session.artifacts_by_kind(kind).await? {
                if library.id != artifact && libraries.insert(library.id) {
                    dependencies.push(library.id);
                }
            }
        }

        let mut seen: HashSet<ArtifactId> = libraries.clone();
        seen.insert(artifact);
        let mut queue = VecDeque::from([artifact]);
        while let Some(next) = queue.pop_front() {
            for dependency in session.artifact_dependencies(next).await? {
                if seen.insert(dependency) {
                    dependencies.push(dependency);
                    queue.push_back(dependency);
                }
            }
        }

        debug!(
            artifact = %artifact,
            dependencies = dependencies.len(),
            "Loaded dependency closure"
        );
        Ok(Self {
            artifact,
            unknowns,
            dependencies,
            libraries,
        })
    }

    pub fn artifact(&self) -> ArtifactId {
        self.artifact
    }

    pub fn dependencies(&self) -> &[ArtifactId] {
        &self.dependencies
    }

    /// Where a relation's right-hand side lives relative to the artifact
    pub fn classify(&self, kind: RelationKind, rhs: &EntityRef) -> RelationClass {
        if kind == RelationKind::Inside || rhs.kind == EntityKind::Duplicate {
            RelationClass::NotApplicable
        } else if rhs.artifact == self.unknowns || rhs.kind == EntityKind::Unknown {
            RelationClass::Unknown
        } else if rhs.artifact == self.artifact {
            RelationClass::Internal
        } else if self.libraries.contains(&rhs.artifact) {
            RelationClass::JavaLibrary
        } else {
            RelationClass::External
        }
    }
}

/// Structural edge still waiting for its target to be resolved
struct Component {
    owner: EntityRef,
    kind: RelationKind,
    fqn: String,
}

/// Per-artifact map from reference string to entity.
///
/// Created entities and relations are staged, not written; the caller
/// flushes them together with the rest of the artifact's stage-two output.
pub struct EntityResolver<'a> {
    context: ResolutionContext,
    unknowns: &'a UnknownsRegistry,
    known: HashMap<String, EntityRef>,
    entities: Vec<EntityRecord>,
    relations: Vec<RelationRecord>,
}

impl<'a> EntityResolver<'a> {
    pub fn new(context: ResolutionContext, unknowns: &'a UnknownsRegistry) -> Self {
        Self {
            context,
            unknowns,
            known: HashMap::new(),
            entities: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Seed the map with the artifact's own declared entities.
    ///
    /// Local variables and parameters are left out: their reference strings
    /// are only unique per scope, so they are found through the store.
    pub fn with_declared(mut self, entities: impl IntoIterator<Item = EntityRecord>) -> Self {
        for entity in entities {
            if matches!(
                entity.kind,
                EntityKind::LocalVariable | EntityKind::Parameter
            ) || entity.kind.is_synthetic()
            {
                continue;
            }
            self.known
                .entry(entity.fqn.clone())
                .or_insert_with(|| EntityRef::from(&entity));
        }
        self
    }

    pub fn context(&self) -> &ResolutionContext {
        &self.context
    }

    /// Entity already recorded for `fqn`, without any lookup
    pub fn known(&self, fqn: &str) -> Option<EntityRef> {
        self.known.get(fqn).copied()
    }

    /// Declared entity of the artifact itself, never creating anything
    pub async fn find_declared(
        &mut self,
        session: &mut dyn StoreSession,
        fqn: &str,
    ) -> Result<Option<EntityRef>> {
        if let Some(entity) = self.known.get(fqn) {
            if entity.artifact == self.context.artifact && entity.kind.is_declared() {
                return Ok(Some(*entity));
            }
        }
        let own = [self.context.artifact];
        Ok(session
            .find_entities_by_ref(fqn, &own)
            .await?
            .first()
            .map(EntityRef::from))
    }

    /// Resolve `fqn` to exactly one entity, creating what is missing.
    ///
    /// Resolving the same string again returns the same entity and stages
    /// nothing new.
    pub async fn resolve(&mut self, session: &mut dyn StoreSession, fqn: &str) -> Result<EntityRef> {
        if let Some(entity) = self.known.get(fqn) {
            return Ok(*entity);
        }

        let mut pending = VecDeque::new();
        let root = self.materialize(session, fqn, &mut pending).await?;
        while let Some(component) = pending.pop_front() {
            let target = match self.known.get(&component.fqn) {
                Some(entity) => *entity,
                None => {
                    self.materialize(session, &component.fqn, &mut pending)
                        .await?
                }
            };
            self.relate(component.kind, component.owner, target, None);
        }
        Ok(root)
    }

    /// Stage a relation owned by the artifact
    pub fn relate(
        &mut self,
        kind: RelationKind,
        lhs: EntityRef,
        rhs: EntityRef,
        location: Option<Location>,
    ) {
        let class = self.context.classify(kind, &rhs);
        self.relations.push(RelationRecord {
            kind,
            class,
            lhs: lhs.id,
            rhs: rhs.id,
            artifact: self.context.artifact,
            location,
        });
    }

    pub fn staged_entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    pub fn staged_relations(&self) -> &[RelationRecord] {
        &self.relations
    }

    /// Hand the staged entities and relations to the caller for flushing
    pub fn into_staged(self) -> (Vec<EntityRecord>, Vec<RelationRecord>) {
        (self.entities, self.relations)
    }

    /// Record `fqn` and queue its components, or look it up if it has no
    /// structure
    async fn materialize(
        &mut self,
        session: &mut dyn StoreSession,
        fqn: &str,
        pending: &mut VecDeque<Component>,
    ) -> Result<EntityRef> {
        let mut multiplicity = None;
        let (kind, components) = match Signature::parse(fqn) {
            Signature::Array {
                element,
                dimensions,
            } => {
                multiplicity = i32::try_from(dimensions).ok();
                (EntityKind::Array, vec![(RelationKind::HasElementsOf, element)])
            }
            Signature::Wildcard(bound) => {
                let components = match bound {
                    WildcardBound::Unbounded => Vec::new(),
                    WildcardBound::Upper(upper) => vec![(RelationKind::HasUpperBound, upper)],
                    WildcardBound::Lower(lower) => vec![(RelationKind::HasLowerBound, lower)],
                };
                (EntityKind::Wildcard, components)
            }
            Signature::TypeVariable { bounds, .. } => (
                EntityKind::TypeVariable,
                bounds
                    .into_iter()
                    .map(|bound| (RelationKind::HasUpperBound, bound))
                    .collect(),
            ),
            Signature::Parameterized { base, arguments } => {
                let mut components = Vec::with_capacity(arguments.len() + 1);
                components.push((RelationKind::HasBaseType, base));
                components.extend(
                    arguments
                        .into_iter()
                        .map(|argument| (RelationKind::HasTypeArgument, argument)),
                );
                (EntityKind::ParameterizedType, components)
            }
            Signature::Method | Signature::Atomic => return self.lookup(session, fqn).await,
        };

        let mut record = EntityRecord::new(self.context.artifact, kind, fqn);
        record.multiplicity = multiplicity;
        let entity = EntityRef::from(&record);
        self.known.insert(fqn.to_string(), entity);
        self.entities.push(record);
        trace!(fqn, kind = %kind, "Created synthetic entity");

        pending.extend(components.into_iter().map(|(kind, fqn)| Component {
            owner: entity,
            kind,
            fqn,
        }));
        Ok(entity)
    }

    /// Find a declared entity in the artifact or its closure
    async fn lookup(&mut self, session: &mut dyn StoreSession, fqn: &str) -> Result<EntityRef> {
        let mut scope = Vec::with_capacity(self.context.dependencies.len() + 1);
        scope.push(self.context.artifact);
        scope.extend_from_slice(&self.context.dependencies);
        let own_artifact = self.context.artifact;
        let matches: Vec<EntityRecord> = session
            .find_entities_by_ref(fqn, &scope)
            .await?
            .into_iter()
            .filter(|candidate| {
                candidate.artifact == own_artifact || candidate.is_visible_to_dependents()
            })
            .collect();

        let own = matches
            .iter()
            .find(|candidate| candidate.artifact == self.context.artifact);
        let entity = match (own, matches.as_slice()) {
            (Some(own), _) => EntityRef::from(own),
            (None, []) => EntityRef {
                id: self.unknowns.get_or_create(session, fqn).await?,
                artifact: self.unknowns.artifact(),
                kind: EntityKind::Unknown,
            },
            (None, [single]) => EntityRef::from(single),
            (None, candidates) => {
                let record =
                    EntityRecord::new(self.context.artifact, EntityKind::Duplicate, fqn);
                let duplicate = EntityRef::from(&record);
                self.entities.push(record);
                for candidate in candidates {
                    self.relate(
                        RelationKind::Matches,
                        duplicate,
                        EntityRef::from(candidate),
                        None,
                    );
                }
                debug!(fqn, candidates = candidates.len(), "Collapsed ambiguous reference");
                duplicate
            }
        };
        self.known.insert(fqn.to_string(), entity);
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializer::initialize_database;
    use javagraph_core::entities::{
        ArtifactDependency, ArtifactRecord, StageMarker, PRIVATE_MODIFIER,
    };
    use javagraph_storage::{GraphStore, LockSet, MemoryStore, Table};
    use pretty_assertions::assert_eq;

    struct Fixture {
        store: MemoryStore,
        session: Box<dyn StoreSession>,
        registry: UnknownsRegistry,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = MemoryStore::new();
            initialize_database(&store).await.unwrap();
            let mut session = store.open_session().await.unwrap();
            let registry = UnknownsRegistry::preload(session.as_mut()).await.unwrap();
            Self {
                store,
                session,
                registry,
            }
        }

        async fn declare(&mut self, name: &str, kind: ArtifactKind, fqns: &[&str]) -> ArtifactId {
            let artifact = ArtifactRecord::new(name, kind).with_stage(StageMarker::StageOneDone);
            let entities: Vec<EntityRecord> = fqns
                .iter()
                .map(|fqn| EntityRecord::new(artifact.id, EntityKind::Class, *fqn))
                .collect();
            self.session
                .lock_tables(&LockSet::new().write(Table::Artifacts).write(Table::Entities))
                .await
                .unwrap();
            self.session.insert_artifact(&artifact).await.unwrap();
            self.session.batch_insert_entities(&entities).await.unwrap();
            self.session.unlock_tables().await.unwrap();
            artifact.id
        }

        async fn insert(&mut self, entity: EntityRecord) {
            self.session
                .lock_tables(&LockSet::new().write(Table::Entities))
                .await
                .unwrap();
            self.session.batch_insert_entities(&[entity]).await.unwrap();
            self.session.unlock_tables().await.unwrap();
        }

        async fn depend(&mut self, artifact: ArtifactId, dependency: ArtifactId) {
            self.session
                .lock_tables(&LockSet::new().write(Table::ArtifactDependencies))
                .await
                .unwrap();
            self.session
                .insert_artifact_dependencies(&[ArtifactDependency {
                    artifact,
                    dependency,
                }])
                .await
                .unwrap();
            self.session.unlock_tables().await.unwrap();
        }

        async fn context(&mut self, artifact: ArtifactId) -> ResolutionContext {
            ResolutionContext::load(self.session.as_mut(), artifact, self.registry.artifact())
                .await
                .unwrap()
        }
    }

    fn kinds(entities: &[EntityRecord]) -> Vec<(EntityKind, &str)> {
        entities.iter().map(|e| (e.kind, e.fqn.as_str())).collect()
    }

    fn edges(relations: &[RelationRecord]) -> Vec<(RelationKind, RelationClass)> {
        relations.iter().map(|r| (r.kind, r.class)).collect()
    }

    #[tokio::test]
    async fn test_ambiguous_reference_collapses_into_one_duplicate() {
        let mut fx = Fixture::new().await;
        let a = fx.declare("a", ArtifactKind::Jar, &["x.Y"]).await;
        let b = fx.declare("b", ArtifactKind::Jar, &["x.Y"]).await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &[]).await;
        fx.depend(p, a).await;
        fx.depend(p, b).await;

        let context = fx.context(p).await;
        let mut resolver = EntityResolver::new(context, &fx.registry);
        let first = resolver.resolve(fx.session.as_mut(), "x.Y").await.unwrap();
        let second = resolver.resolve(fx.session.as_mut(), "x.Y").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.kind, EntityKind::Duplicate);
        assert_eq!(first.artifact, p);
        assert_eq!(resolver.staged_entities().len(), 1);

        let (_, relations) = resolver.into_staged();
        assert_eq!(
            edges(&relations),
            vec![
                (RelationKind::Matches, RelationClass::External),
                (RelationKind::Matches, RelationClass::External),
            ]
        );
        let targets: HashSet<ArtifactId> = relations
            .iter()
            .map(|r| {
                fx.store
                    .entities_named("x.Y")
                    .into_iter()
                    .find(|e| e.id == r.rhs)
                    .unwrap()
                    .artifact
            })
            .collect();
        assert_eq!(targets, HashSet::from([a, b]));
    }

    #[tokio::test]
    async fn test_private_and_local_declarations_of_dependencies_are_invisible() {
        let mut fx = Fixture::new().await;
        let a = fx.declare("a", ArtifactKind::Jar, &[]).await;
        let b = fx.declare("b", ArtifactKind::Jar, &[]).await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &[]).await;
        fx.depend(p, a).await;
        fx.depend(p, b).await;

        for jar in [a, b] {
            let mut inner = EntityRecord::new(jar, EntityKind::Class, "x.Y.Inner");
            inner.modifiers = Some(PRIVATE_MODIFIER);
            fx.insert(inner).await;
            fx.insert(EntityRecord::new(jar, EntityKind::LocalVariable, "x.Y.m()#v"))
                .await;
        }
        let mut public = EntityRecord::new(a, EntityKind::Class, "x.Y.Open");
        public.modifiers = Some(0x0001);
        let public_id = public.id;
        fx.insert(public).await;
        let mut hidden = EntityRecord::new(b, EntityKind::Class, "x.Y.Open");
        hidden.modifiers = Some(PRIVATE_MODIFIER);
        fx.insert(hidden).await;

        let context = fx.context(p).await;
        let mut resolver = EntityResolver::new(context, &fx.registry);
        let inner = resolver
            .resolve(fx.session.as_mut(), "x.Y.Inner")
            .await
            .unwrap();
        let local = resolver
            .resolve(fx.session.as_mut(), "x.Y.m()#v")
            .await
            .unwrap();
        let open = resolver
            .resolve(fx.session.as_mut(), "x.Y.Open")
            .await
            .unwrap();

        assert_eq!(inner.kind, EntityKind::Unknown);
        assert_eq!(local.kind, EntityKind::Unknown);
        assert_eq!(open.id, public_id);
        assert!(resolver.staged_entities().is_empty());
    }

    #[tokio::test]
    async fn test_own_private_declaration_still_resolves() {
        let mut fx = Fixture::new().await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &[]).await;
        let mut secret = EntityRecord::new(p, EntityKind::Field, "p.Main.secret");
        secret.modifiers = Some(PRIVATE_MODIFIER);
        let secret_id = secret.id;
        fx.insert(secret).await;

        let context = fx.context(p).await;
        let mut resolver = EntityResolver::new(context, &fx.registry);
        let entity = resolver
            .resolve(fx.session.as_mut(), "p.Main.secret")
            .await
            .unwrap();
        assert_eq!(entity.id, secret_id);
    }

    #[tokio::test]
    async fn test_own_declaration_wins_over_dependencies() {
        let mut fx = Fixture::new().await;
        let a = fx.declare("a", ArtifactKind::Jar, &["x.Y"]).await;
        let b = fx.declare("b", ArtifactKind::Jar, &["x.Y"]).await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &["x.Y"]).await;
        fx.depend(p, a).await;
        fx.depend(p, b).await;

        let context = fx.context(p).await;
        let mut resolver = EntityResolver::new(context, &fx.registry);
        let entity = resolver.resolve(fx.session.as_mut(), "x.Y").await.unwrap();

        assert_eq!(entity.artifact, p);
        assert_eq!(entity.kind, EntityKind::Class);
        assert!(resolver.staged_entities().is_empty());
        assert!(resolver.staged_relations().is_empty());
    }

    #[tokio::test]
    async fn test_transitive_dependency_is_in_scope() {
        let mut fx = Fixture::new().await;
        let c = fx.declare("c", ArtifactKind::Jar, &["z.Z"]).await;
        let a = fx.declare("a", ArtifactKind::Jar, &[]).await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &["p.Main"]).await;
        fx.depend(p, a).await;
        fx.depend(a, c).await;

        let context = fx.context(p).await;
        assert!(context.dependencies().contains(&c));
        let mut resolver = EntityResolver::new(context, &fx.registry);
        let entity = resolver.resolve(fx.session.as_mut(), "z.Z").await.unwrap();
        assert_eq!(entity.artifact, c);

        let main = resolver
            .find_declared(fx.session.as_mut(), "p.Main")
            .await
            .unwrap()
            .unwrap();
        resolver.relate(RelationKind::Uses, main, entity, None);
        assert_eq!(
            edges(resolver.staged_relations()),
            vec![(RelationKind::Uses, RelationClass::External)]
        );
    }

    #[tokio::test]
    async fn test_nested_parameterized_type_decomposes() {
        let mut fx = Fixture::new().await;
        fx.declare("jdk", ArtifactKind::JavaLibrary, &["java.lang.String"])
            .await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &[]).await;

        let context = fx.context(p).await;
        let mut resolver = EntityResolver::new(context, &fx.registry);
        let fqn = "java.util.Map<java.lang.String,java.util.List<java.lang.Integer>>";
        let entity = resolver.resolve(fx.session.as_mut(), fqn).await.unwrap();

        assert_eq!(entity.kind, EntityKind::ParameterizedType);
        assert_eq!(
            kinds(resolver.staged_entities()),
            vec![
                (EntityKind::ParameterizedType, fqn),
                (
                    EntityKind::ParameterizedType,
                    "java.util.List<java.lang.Integer>"
                ),
            ]
        );
        assert_eq!(
            edges(resolver.staged_relations()),
            vec![
                (RelationKind::HasBaseType, RelationClass::Unknown),
                (RelationKind::HasTypeArgument, RelationClass::JavaLibrary),
                (RelationKind::HasTypeArgument, RelationClass::Internal),
                (RelationKind::HasBaseType, RelationClass::Unknown),
                (RelationKind::HasTypeArgument, RelationClass::Unknown),
            ]
        );
        assert!(fx.registry.contains("java.util.Map").await);
        assert!(fx.registry.contains("java.lang.Integer").await);
        assert!(!fx.registry.contains("java.lang.String").await);
    }

    #[tokio::test]
    async fn test_repeated_component_is_created_once() {
        let mut fx = Fixture::new().await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &["a.Pair", "a.K"]).await;

        let context = fx.context(p).await;
        let mut resolver = EntityResolver::new(context, &fx.registry);
        resolver
            .resolve(fx.session.as_mut(), "a.Pair<a.K[],a.K[]>")
            .await
            .unwrap();
        let before = (
            resolver.staged_entities().len(),
            resolver.staged_relations().len(),
        );
        resolver
            .resolve(fx.session.as_mut(), "a.Pair<a.K[],a.K[]>")
            .await
            .unwrap();

        assert_eq!(
            kinds(resolver.staged_entities()),
            vec![
                (EntityKind::ParameterizedType, "a.Pair<a.K[],a.K[]>"),
                (EntityKind::Array, "a.K[]"),
            ]
        );
        assert_eq!(
            edges(resolver.staged_relations()),
            vec![
                (RelationKind::HasBaseType, RelationClass::Internal),
                (RelationKind::HasTypeArgument, RelationClass::Internal),
                (RelationKind::HasTypeArgument, RelationClass::Internal),
                (RelationKind::HasElementsOf, RelationClass::Internal),
            ]
        );
        assert_eq!(
            before,
            (
                resolver.staged_entities().len(),
                resolver.staged_relations().len()
            )
        );
    }

    #[tokio::test]
    async fn test_array_of_primitive_points_at_primitives_artifact() {
        let mut fx = Fixture::new().await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &[]).await;

        let context = fx.context(p).await;
        let mut resolver = EntityResolver::new(context, &fx.registry);
        resolver
            .resolve(fx.session.as_mut(), "int[][]")
            .await
            .unwrap();

        let array = &resolver.staged_entities()[0];
        assert_eq!(array.kind, EntityKind::Array);
        assert_eq!(array.multiplicity, Some(2));
        assert_eq!(
            edges(resolver.staged_relations()),
            vec![(RelationKind::HasElementsOf, RelationClass::JavaLibrary)]
        );
    }

    #[tokio::test]
    async fn test_wildcards_and_type_variables_link_their_bounds() {
        let mut fx = Fixture::new().await;
        fx.declare("jdk", ArtifactKind::JavaLibrary, &["java.lang.Number"])
            .await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &[]).await;

        let context = fx.context(p).await;
        let mut resolver = EntityResolver::new(context, &fx.registry);
        let wildcard = resolver
            .resolve(fx.session.as_mut(), "<?-java.lang.Number>")
            .await
            .unwrap();
        let unbounded = resolver.resolve(fx.session.as_mut(), "<?>").await.unwrap();
        let variable = resolver
            .resolve(fx.session.as_mut(), "<T+java.lang.Number&p.Marker>")
            .await
            .unwrap();

        assert_eq!(wildcard.kind, EntityKind::Wildcard);
        assert_eq!(unbounded.kind, EntityKind::Wildcard);
        assert_eq!(variable.kind, EntityKind::TypeVariable);
        assert_eq!(
            edges(resolver.staged_relations()),
            vec![
                (RelationKind::HasLowerBound, RelationClass::JavaLibrary),
                (RelationKind::HasUpperBound, RelationClass::JavaLibrary),
                (RelationKind::HasUpperBound, RelationClass::Unknown),
            ]
        );
    }

    #[tokio::test]
    async fn test_inside_and_duplicate_targets_are_not_classified() {
        let mut fx = Fixture::new().await;
        let p = fx.declare("p", ArtifactKind::SourceProject, &[]).await;
        let context = fx.context(p).await;

        let local = EntityRef {
            id: EntityId::new(),
            artifact: p,
            kind: EntityKind::Class,
        };
        let duplicate = EntityRef {
            kind: EntityKind::Duplicate,
            ..local
        };
        assert_eq!(
            context.classify(RelationKind::Inside, &local),
            RelationClass::NotApplicable
        );
        assert_eq!(
            context.classify(RelationKind::Uses, &duplicate),
            RelationClass::NotApplicable
        );
        assert_eq!(
            context.classify(RelationKind::Uses, &local),
            RelationClass::Internal
        );
    }
}
