use incursion_core::{EntityId, EntityKind};

use crate::entity::Entity;

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    occupant: Option<Entity>,
}

impl Slot {
    fn resolve(&self, id: EntityId) -> Option<&Entity> {
        if self.generation != id.generation() {
            return None;
        }
        self.occupant.as_ref()
    }

    fn resolve_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if self.generation != id.generation() {
            return None;
        }
        self.occupant.as_mut()
    }

    fn vacate(&mut self) -> Option<Entity> {
        let occupant = self.occupant.take();
        if occupant.is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
        occupant
    }
}

/// Per-kind slot arenas. Dead entities keep their slot until pruned, and a
/// vacated slot bumps its generation so stale ids never resolve again.
///
/// Each kind holds at most `u32::MAX + 1` slots, the range an [`EntityId`]
/// slot number can address. Free slots are reused lowest first, so the arena
/// only grows with the peak population of a kind.
#[derive(Clone, Debug, Default)]
pub(crate) struct Registry {
    collections: [Vec<Slot>; EntityKind::COUNT],
}

impl Registry {
    /// Stores the entity built by `build` in the first free slot of its kind.
    pub(crate) fn insert(
        &mut self,
        kind: EntityKind,
        build: impl FnOnce(EntityId) -> Entity,
    ) -> EntityId {
        let slots = &mut self.collections[kind.index()];
        let index = match slots.iter().position(|slot| slot.occupant.is_none()) {
            Some(index) => index,
            None => {
                slots.push(Slot::default());
                slots.len() - 1
            }
        };
        debug_assert!(
            u32::try_from(index).is_ok(),
            "{kind:?} arena outgrew the EntityId slot range"
        );
        let slot = &mut slots[index];
        let id = EntityId::new(kind, index as u32, slot.generation);
        slot.occupant = Some(build(id));
        id
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&Entity> {
        self.collections[id.kind().index()]
            .get(id.slot() as usize)
            .and_then(|slot| slot.resolve(id))
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.collections[id.kind().index()]
            .get_mut(id.slot() as usize)
            .and_then(|slot| slot.resolve_mut(id))
    }

    pub(crate) fn live(&self, id: EntityId) -> Option<&Entity> {
        self.get(id).filter(|entity| entity.alive)
    }

    pub(crate) fn live_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.get_mut(id).filter(|entity| entity.alive)
    }

    /// Borrows two distinct entities mutably at once.
    pub(crate) fn pair_mut(
        &mut self,
        first: EntityId,
        second: EntityId,
    ) -> Option<(&mut Entity, &mut Entity)> {
        let (slot_a, slot_b) = if first.kind() == second.kind() {
            two_mut(
                &mut self.collections[first.kind().index()],
                first.slot() as usize,
                second.slot() as usize,
            )?
        } else {
            let (list_a, list_b) = two_mut(
                &mut self.collections,
                first.kind().index(),
                second.kind().index(),
            )?;
            (
                list_a.get_mut(first.slot() as usize)?,
                list_b.get_mut(second.slot() as usize)?,
            )
        };
        Some((slot_a.resolve_mut(first)?, slot_b.resolve_mut(second)?))
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.collections[id.kind().index()].get_mut(id.slot() as usize)?;
        if slot.resolve(id).is_none() {
            return None;
        }
        slot.vacate()
    }

    /// Vacates the slots of dead entities of every kind except the player.
    pub(crate) fn prune_dead(&mut self) -> usize {
        let mut pruned = 0;
        for kind in EntityKind::ALL {
            if kind == EntityKind::Player {
                continue;
            }
            for slot in &mut self.collections[kind.index()] {
                if slot.occupant.as_ref().is_some_and(|entity| !entity.alive) {
                    let _ = slot.vacate();
                    pruned += 1;
                }
            }
        }
        pruned
    }

    /// Entities of one kind in slot order, dead ones included.
    pub(crate) fn iter_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> + '_ {
        self.collections[kind.index()]
            .iter()
            .filter_map(|slot| slot.occupant.as_ref())
    }

    /// Every stored entity in registry order, dead ones included.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.collections
            .iter_mut()
            .flat_map(|slots| slots.iter_mut())
            .filter_map(|slot| slot.occupant.as_mut())
    }

    /// Appends the ids of live entities of the provided kinds, kind by kind.
    pub(crate) fn live_ids(&self, kinds: &[EntityKind], out: &mut Vec<EntityId>) {
        for kind in kinds {
            out.extend(
                self.iter_kind(*kind)
                    .filter(|entity| entity.alive)
                    .map(|entity| entity.id),
            );
        }
    }
}

fn two_mut<T>(items: &mut [T], first: usize, second: usize) -> Option<(&mut T, &mut T)> {
    if first == second || first.max(second) >= items.len() {
        return None;
    }
    if first < second {
        let (head, tail) = items.split_at_mut(second);
        Some((&mut head[first], &mut tail[0]))
    } else {
        let (head, tail) = items.split_at_mut(first);
        Some((&mut tail[0], &mut head[second]))
    }
}
