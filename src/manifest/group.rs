//! Clip grouping by actor

use std::collections::HashMap;

use super::Clip;

/// All clips of one actor, in manifest order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub actor: String,
    pub clips: Vec<Clip>,
}

/// Partition clips by actor.
///
/// Groups come out in order of each actor's first appearance and keep
/// manifest order inside; clips are never re-sorted by `start_at`.
pub fn group_by_actor(clips: &[Clip]) -> Vec<Group> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for clip in clips {
        let slot = *index.entry(clip.actor.as_str()).or_insert_with(|| {
            groups.push(Group {
                actor: clip.actor.clone(),
                clips: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].clips.push(clip.clone());
    }

    groups
}
