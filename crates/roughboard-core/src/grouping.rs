//! Composing elements into nested groups and back.

use crate::element::{Element, ElementId};
use crate::geometry::union_bounds;
use crate::scene::Scene;
use std::collections::HashMap;

/// Group the given top-level elements into a new group element.
///
/// Returns the new group's id, or `None` if fewer than two of the ids name
/// top-level elements. The group takes the z position of the frontmost member.
pub fn group(scene: &mut Scene, ids: &[ElementId]) -> Option<ElementId> {
    let mut group_id = ElementId::generate();
    while scene.contains_deep(&group_id) {
        group_id = ElementId::generate();
    }
    compose(scene, ids, group_id)
}

/// Dissolve a group, putting its children back at top level in absolute
/// coordinates at the group's z position.
///
/// Returns the children's ids, or `None` if `group_id` is not a top-level group.
pub fn ungroup(scene: &mut Scene, group_id: &ElementId) -> Option<Vec<ElementId>> {
    if !scene.get(group_id)?.is_group() {
        return None;
    }
    let z_pos = scene.index_of(group_id)?;
    let mut group = scene.remove(group_id)?;
    let offset = group.origin().to_vec2();
    let children = group.children_mut().map(std::mem::take).unwrap_or_default();

    let mut child_ids = Vec::with_capacity(children.len());
    for (i, mut child) in children.into_iter().enumerate() {
        child.translate(offset);
        child.group_id = None;
        child_ids.push(child.id.clone());
        scene.insert_at(z_pos + i, child);
    }
    log::debug!("Ungrouped {group_id} into {} element(s)", child_ids.len());
    Some(child_ids)
}

/// Whether `ids` name enough top-level elements to group.
pub fn can_group(scene: &Scene, ids: &[ElementId]) -> bool {
    ids.iter().filter(|id| scene.contains(id)).count() >= 2
}

/// Whether `ids` is exactly one top-level group.
pub fn can_ungroup(scene: &Scene, ids: &[ElementId]) -> bool {
    matches!(ids, [id] if scene.get(id).is_some_and(Element::is_group))
}

/// Turn flat `groupId` tags on top-level elements into nested groups.
///
/// Two or more elements sharing a tag that does not name an existing element
/// become children of a new group with that id. Any other tag is cleared.
/// Children of nested groups get their `groupId` set to their parent.
/// Returns the number of groups created.
pub fn fold_tag_groups(scene: &mut Scene) -> usize {
    let mut tagged: Vec<(ElementId, Vec<ElementId>)> = Vec::new();
    let mut index: HashMap<ElementId, usize> = HashMap::new();
    for element in scene.ordered() {
        if let Some(tag) = &element.group_id {
            let slot = *index.entry(tag.clone()).or_insert_with(|| {
                tagged.push((tag.clone(), Vec::new()));
                tagged.len() - 1
            });
            tagged[slot].1.push(element.id.clone());
        }
    }

    let mut created = 0;
    for (tag, members) in tagged {
        if members.len() >= 2 && !scene.contains_deep(&tag) {
            if compose(scene, &members, tag).is_some() {
                created += 1;
            }
        } else {
            log::warn!("Clearing group tag {tag} on {} element(s)", members.len());
            for id in &members {
                if let Some(element) = scene.get_mut(id) {
                    element.group_id = None;
                }
            }
        }
    }

    scene.visit_mut(&mut |element| {
        let parent = element.id.clone();
        if let Some(children) = element.children_mut() {
            for child in children {
                child.group_id = Some(parent.clone());
            }
        }
    });
    created
}

fn compose(scene: &mut Scene, ids: &[ElementId], group_id: ElementId) -> Option<ElementId> {
    // Members in z-order, back to front
    let members: Vec<(usize, ElementId)> = scene
        .ordered_ids()
        .iter()
        .enumerate()
        .filter(|(_, id)| ids.contains(id))
        .map(|(idx, id)| (idx, id.clone()))
        .collect();
    if members.len() < 2 {
        return None;
    }

    let bounds = union_bounds(members.iter().filter_map(|(_, id)| scene.get(id)))?;
    let max_z_idx = members.iter().map(|(idx, _)| *idx).max().unwrap_or(0);

    let mut children = Vec::with_capacity(members.len());
    for (_, id) in &members {
        if let Some(mut child) = scene.remove(id) {
            child.translate(-bounds.origin().to_vec2());
            child.group_id = Some(group_id.clone());
            children.push(child);
        }
    }

    let insert_pos = max_z_idx.saturating_sub(children.len().saturating_sub(1));
    scene.insert_at(insert_pos, Element::group(group_id.clone(), bounds, children));
    log::debug!("Grouped {} element(s) into {group_id}", members.len());
    Some(group_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ActiveStyle, ElementType};
    use crate::geometry::bounds_of;
    use kurbo::{Point, Rect};

    fn make(element_type: ElementType, start: (f64, f64), end: (f64, f64)) -> Element {
        Element::create(element_type, start.into(), end.into(), &ActiveStyle::default())
    }

    fn sample_scene() -> (Scene, Vec<ElementId>) {
        let mut scene = Scene::new();
        let ids = vec![
            scene.add(make(ElementType::Rectangle, (10.0, 20.0), (60.0, 70.0))),
            scene.add(make(ElementType::Ellipse, (130.0, 40.0), (90.0, 5.0))),
            scene.add(make(ElementType::Arrow, (-30.0, 100.0), (40.0, 160.0))),
            scene.add(make(ElementType::Text, (200.0, 200.0), (200.0, 200.0))),
        ];
        (scene, ids)
    }

    #[test]
    fn test_group_requires_two() {
        let (mut scene, ids) = sample_scene();
        assert!(group(&mut scene, &ids[..1]).is_none());
        assert!(group(&mut scene, &[ids[0].clone(), ElementId::from("missing")]).is_none());
        assert_eq!(scene.len(), 4);
        assert!(!can_group(&scene, &ids[..1]));
        assert!(can_group(&scene, &ids[..2]));
    }

    #[test]
    fn test_group_bounds_and_relative_children() {
        let (mut scene, ids) = sample_scene();
        let gid = group(&mut scene, &ids[..3]).unwrap();
        assert_eq!(scene.len(), 2);

        let group = scene.get(&gid).unwrap();
        assert_eq!(bounds_of(group), Rect::new(-30.0, 5.0, 130.0, 160.0));
        for child in group.children() {
            assert_eq!(child.group_id.as_ref(), Some(&gid));
        }
        let rect = &group.children()[0];
        assert_eq!(rect.origin(), Point::new(40.0, 15.0));
        assert!(can_ungroup(&scene, std::slice::from_ref(&gid)));
        assert!(!can_ungroup(&scene, &[gid.clone(), ids[3].clone()]));
    }

    #[test]
    fn test_group_takes_frontmost_position() {
        let (mut scene, ids) = sample_scene();
        let gid = group(&mut scene, &[ids[0].clone(), ids[2].clone()]).unwrap();
        assert_eq!(scene.ordered_ids(), &[ids[1].clone(), gid, ids[3].clone()]);
    }

    #[test]
    fn test_ungroup_roundtrip_restores_positions() {
        let (mut scene, ids) = sample_scene();
        let before: Vec<Element> = ids.iter().filter_map(|id| scene.get(id).cloned()).collect();

        let gid = group(&mut scene, &[ids[2].clone(), ids[0].clone(), ids[1].clone()]).unwrap();
        let children = ungroup(&mut scene, &gid).unwrap();
        assert_eq!(children.len(), 3);
        assert!(!scene.contains(&gid));
        assert_eq!(scene.len(), 4);

        for original in &before {
            let restored = scene.get(&original.id).unwrap();
            assert!((restored.x - original.x).abs() < 1e-9);
            assert!((restored.y - original.y).abs() < 1e-9);
            assert_eq!(restored.size(), original.size());
            assert_eq!(restored.points(), original.points());
            assert!(restored.group_id.is_none());
        }
    }

    #[test]
    fn test_ungroup_non_group_is_noop() {
        let (mut scene, ids) = sample_scene();
        assert!(ungroup(&mut scene, &ids[0]).is_none());
        assert!(ungroup(&mut scene, &ElementId::from("missing")).is_none());
        assert_eq!(scene.len(), 4);
    }

    #[test]
    fn test_nested_groups() {
        let (mut scene, ids) = sample_scene();
        let inner = group(&mut scene, &ids[..2]).unwrap();
        let outer = group(&mut scene, &[inner.clone(), ids[2].clone()]).unwrap();
        assert_eq!(scene.len(), 2);
        let located = scene.locate(&ids[0]).unwrap();
        assert!((located.x - 10.0).abs() < 1e-9);
        assert!((located.y - 20.0).abs() < 1e-9);

        ungroup(&mut scene, &outer).unwrap();
        ungroup(&mut scene, &inner).unwrap();
        assert!((scene.get(&ids[0]).unwrap().x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fold_tag_groups() {
        let (mut scene, ids) = sample_scene();
        for id in &ids[..2] {
            scene.get_mut(id).unwrap().group_id = Some(ElementId::from("tag"));
        }
        scene.get_mut(&ids[3]).unwrap().group_id = Some(ElementId::from("lonely"));

        assert_eq!(fold_tag_groups(&mut scene), 1);
        let tag = ElementId::from("tag");
        let group = scene.get(&tag).unwrap();
        assert_eq!(group.children().len(), 2);
        assert!(scene.get(&ids[3]).unwrap().group_id.is_none());
        assert!(scene.get(&ids[2]).unwrap().group_id.is_none());
    }
}
