//! Service registry
//! Immutable, validated table of service definitions grouped by priority

use crate::domain::{DomainError, ServiceDefinition, ServiceId};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Services sharing one priority value.
///
/// `waves` orders the members by in-group dependencies: every member of a
/// wave only depends on services of earlier groups or earlier waves.
#[derive(Debug, Clone)]
pub struct PriorityGroup {
    pub priority: i32,
    pub waves: Vec<Vec<ServiceId>>,
}

impl PriorityGroup {
    pub fn members(&self) -> impl Iterator<Item = &ServiceId> {
        self.waves.iter().flatten()
    }
}

#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    definitions: BTreeMap<ServiceId, ServiceDefinition>,
    groups: Vec<PriorityGroup>,
}

impl ServiceRegistry {
    /// Build and validate the registry.
    ///
    /// Fails on duplicate ids, unknown dependencies, dependencies on a later
    /// priority group and dependency cycles.
    pub fn new(definitions: Vec<ServiceDefinition>) -> Result<Self, DomainError> {
        let mut table = BTreeMap::new();
        for definition in definitions {
            let id = definition.id().clone();
            if table.insert(id.clone(), definition).is_some() {
                return Err(DomainError::DuplicateService(id.to_string()));
            }
        }

        Self::validate_dependencies(&table)?;
        let groups = Self::compute_groups(&table)?;

        Ok(Self {
            definitions: table,
            groups,
        })
    }

    fn validate_dependencies(
        table: &BTreeMap<ServiceId, ServiceDefinition>,
    ) -> Result<(), DomainError> {
        for definition in table.values() {
            for dep in definition.dependencies() {
                let Some(dep_def) = table.get(dep) else {
                    return Err(DomainError::DependencyNotFound {
                        service: definition.id().to_string(),
                        dependency: dep.to_string(),
                    });
                };
                if dep_def.priority() > definition.priority() {
                    return Err(DomainError::DependencyInLaterGroup {
                        service: definition.id().to_string(),
                        priority: definition.priority(),
                        dependency: dep.to_string(),
                        dependency_priority: dep_def.priority(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Group by priority, then split each group into dependency waves (Kahn)
    fn compute_groups(
        table: &BTreeMap<ServiceId, ServiceDefinition>,
    ) -> Result<Vec<PriorityGroup>, DomainError> {
        let mut by_priority: BTreeMap<i32, Vec<&ServiceId>> = BTreeMap::new();
        for (id, definition) in table {
            by_priority.entry(definition.priority()).or_default().push(id);
        }

        let mut groups = Vec::with_capacity(by_priority.len());
        for (priority, members) in by_priority {
            let mut in_degree: HashMap<&ServiceId, usize> = HashMap::new();
            let mut dependents: HashMap<&ServiceId, Vec<&ServiceId>> = HashMap::new();
            for id in &members {
                in_degree.insert(*id, 0);
            }
            for id in &members {
                for dep in table[*id].dependencies() {
                    // Dependencies in earlier groups are already settled
                    if in_degree.contains_key(dep) {
                        dependents.entry(dep).or_default().push(*id);
                        if let Some(degree) = in_degree.get_mut(*id) {
                            *degree += 1;
                        }
                    }
                }
            }

            let mut current: VecDeque<&ServiceId> = members
                .iter()
                .copied()
                .filter(|id| in_degree[id] == 0)
                .collect();
            let mut waves = Vec::new();
            let mut placed = 0;

            while !current.is_empty() {
                let mut next = VecDeque::new();
                let mut wave = Vec::with_capacity(current.len());
                while let Some(id) = current.pop_front() {
                    wave.push(id.clone());
                    for dependent in dependents.get(id).into_iter().flatten() {
                        if let Some(degree) = in_degree.get_mut(*dependent) {
                            *degree -= 1;
                            if *degree == 0 {
                                next.push_back(*dependent);
                            }
                        }
                    }
                }
                placed += wave.len();
                wave.sort();
                waves.push(wave);
                current = next;
            }

            if placed != members.len() {
                let mut cycle: Vec<String> = in_degree
                    .into_iter()
                    .filter(|(_, degree)| *degree > 0)
                    .map(|(id, _)| id.to_string())
                    .collect();
                cycle.sort();
                return Err(DomainError::DependencyCycle(cycle));
            }

            groups.push(PriorityGroup { priority, waves });
        }
        Ok(groups)
    }

    /// Groups in ascending priority order
    pub fn groups(&self) -> &[PriorityGroup] {
        &self.groups
    }

    /// Definitions grouped by priority, ascending
    pub fn definitions_by_priority(&self) -> Vec<Vec<&ServiceDefinition>> {
        self.groups
            .iter()
            .map(|g| g.members().map(|id| &self.definitions[id]).collect())
            .collect()
    }

    pub fn lookup(&self, id: &str) -> Result<&ServiceDefinition, DomainError> {
        self.definitions
            .get(id)
            .ok_or_else(|| DomainError::ServiceNotFound(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &ServiceId> {
        self.definitions.keys()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
