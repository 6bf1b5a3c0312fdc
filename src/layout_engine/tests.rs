use proptest::prelude::*;

use crate::layout_engine::LayoutDescription::*;
use crate::layout_engine::{
    Direction, LayoutDescription, LayoutKind, LayoutMode, MoveOutcome, Orientation, TilingTree,
    WindowId, WorkspaceId,
};
use crate::model::tree::NodeId;

fn w(id: u32) -> WindowId { WindowId(id) }

struct Harness {
    tree: TilingTree,
    ws: WorkspaceId,
}

impl Harness {
    fn new(root: LayoutKind, children: &[LayoutDescription]) -> Self {
        let mut tree = TilingTree::new();
        let ws = tree.create_workspace(root);
        let root = tree.root_container(ws).unwrap();
        tree.build_in(root, children).unwrap();
        Harness { tree, ws }
    }

    fn h(children: &[LayoutDescription]) -> Self { Self::new(LayoutKind::HorizontalTiles, children) }

    fn node(&self, id: u32) -> NodeId { self.tree.node_for_window(w(id)).unwrap() }

    fn root(&self) -> NodeId { self.tree.root_container(self.ws).unwrap() }

    fn focus(&mut self, id: u32) { self.tree.focus_window(w(id)).unwrap(); }

    fn move_through(&mut self, id: u32, direction: Direction) -> MoveOutcome {
        let outcome = self.tree.move_through(w(id), direction).unwrap();
        self.tree.verify_invariants();
        outcome
    }

    fn root_shape(&self) -> LayoutDescription { self.tree.describe(self.root()) }

    fn workspace_shape(&self) -> LayoutDescription {
        self.tree.describe_workspace(self.ws).unwrap()
    }

    fn weight(&self, id: u32, orientation: Orientation) -> f64 {
        self.tree.weight(self.node(id), orientation)
    }
}

mod move_through_scenarios {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn swap_windows() {
        let mut h = Harness::h(&[Window(1), Window(2)]);
        h.focus(1);
        let outcome = h.move_through(1, Direction::Right);
        assert_eq!(MoveOutcome::Swapped { with: h.node(2) }, outcome);
        assert_eq!(HTiles(vec![Window(2), Window(1)]), h.root_shape());
    }

    #[test]
    fn swap_left_then_right_restores_order_and_weights() {
        let mut h = Harness::h(&[Window(1), Window(2), Window(3)]);
        for (id, weight) in [(1, 1.5), (2, 2.5), (3, 0.5)] {
            let node = h.node(id);
            h.tree.set_weight(node, Orientation::Horizontal, weight).unwrap();
        }
        let weights = |h: &Harness| {
            [1, 2, 3].map(|id| {
                (h.weight(id, Orientation::Horizontal), h.weight(id, Orientation::Vertical))
            })
        };
        let before = weights(&h);

        h.move_through(2, Direction::Left);
        assert_eq!(HTiles(vec![Window(2), Window(1), Window(3)]), h.root_shape());
        assert_eq!(before, weights(&h));
        h.move_through(2, Direction::Right);
        assert_eq!(HTiles(vec![Window(1), Window(2), Window(3)]), h.root_shape());
        assert_eq!(before, weights(&h));
        assert_eq!(Some(2.5 / 4.5), h.tree.proportion(h.node(2)));
    }

    #[test]
    fn move_into_top_most_container_with_matching_orientation() {
        let mut h = Harness::h(&[Window(0), Window(1), HTiles(vec![HTiles(vec![Window(2)])])]);
        h.focus(1);
        h.move_through(1, Direction::Right);
        assert_eq!(
            HTiles(vec![Window(0), HTiles(vec![Window(1), HTiles(vec![Window(2)])])]),
            h.root_shape()
        );
    }

    #[test]
    fn move_follows_most_recent_path() {
        let mut h = Harness::h(&[
            Window(0),
            Window(1),
            VTiles(vec![HTiles(vec![Window(2), Window(3)]), Window(4)]),
        ]);
        let marked = h.node(3);
        h.tree.mark_most_recent(marked);
        h.focus(1);

        let outcome = h.move_through(1, Direction::Right);
        let target = h.tree.parent(h.node(2)).unwrap();
        assert_eq!(MoveOutcome::MovedInto { container: target }, outcome);
        assert_eq!(
            HTiles(vec![
                Window(0),
                VTiles(vec![HTiles(vec![Window(1), Window(2), Window(3)]), Window(4)]),
            ]),
            h.root_shape()
        );
    }

    #[test]
    fn moving_left_into_container_appends_at_the_back() {
        let mut h = Harness::h(&[HTiles(vec![Window(1), Window(2)]), Window(3)]);
        let inner = h.tree.parent(h.node(1)).unwrap();
        h.move_through(3, Direction::Left);
        assert_eq!(
            Workspace(vec![HTiles(vec![Window(1), Window(2), Window(3)])]),
            h.workspace_shape()
        );
        assert_eq!(inner, h.root());
        assert!(h.tree.degenerate_containers().is_empty());
    }

    #[test]
    fn swap_preserves_weights() {
        let mut h = Harness::h(&[Window(1), Window(2)]);
        let node = h.node(2);
        h.tree.set_weight(node, Orientation::Horizontal, 2.0).unwrap();
        h.focus(2);

        h.move_through(2, Direction::Left);
        assert_eq!(HTiles(vec![Window(2), Window(1)]), h.root_shape());
        assert_eq!(2.0, h.weight(2, Orientation::Horizontal));
        assert_eq!(1.0, h.weight(1, Orientation::Horizontal));
    }

    #[test]
    fn moving_in_gives_unit_weights() {
        let mut h = Harness::h(&[Window(0), Window(1), VTiles(vec![Window(2)])]);
        let node = h.node(1);
        h.tree.set_weight(node, Orientation::Horizontal, 2.0).unwrap();
        h.focus(1);

        h.move_through(1, Direction::Right);
        assert_eq!(1.0, h.weight(2, Orientation::Horizontal));
        assert_eq!(1.0, h.weight(2, Orientation::Vertical));
        assert_eq!(1.0, h.weight(1, Orientation::Vertical));
        assert_eq!(1.0, h.weight(1, Orientation::Horizontal));
    }

    #[test]
    fn descending_to_a_window_wraps_it() {
        let mut h = Harness::h(&[Window(0), Window(1), VTiles(vec![Window(2), Window(3)])]);
        let marked = h.node(3);
        h.tree.mark_most_recent(marked);
        h.focus(1);

        let outcome = h.move_through(1, Direction::Right);
        let MoveOutcome::WrappedWith { leaf, container } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(h.node(3), leaf);
        assert_eq!(Some(LayoutKind::HorizontalTiles), h.tree.layout(container));
        assert_eq!(
            HTiles(vec![Window(0), VTiles(vec![Window(2), HTiles(vec![Window(1), Window(3)])])]),
            h.root_shape()
        );
    }

    #[test]
    fn wrapping_from_the_right_puts_window_last() {
        let mut h = Harness::h(&[VTiles(vec![Window(1), Window(2)]), Window(3)]);
        h.move_through(3, Direction::Left);
        assert_eq!(
            Workspace(vec![VTiles(vec![HTiles(vec![Window(1), Window(3)]), Window(2)])]),
            h.workspace_shape()
        );
    }

    #[test]
    fn wrapped_window_keeps_its_slot_weight() {
        let mut h = Harness::h(&[Window(1), VTiles(vec![Window(2), Window(3)])]);
        let node = h.node(2);
        h.tree.set_weight(node, Orientation::Vertical, 3.0).unwrap();
        h.focus(1);

        h.move_through(1, Direction::Right);
        let wrapper = h.tree.parent(h.node(2)).unwrap();
        assert_eq!(3.0, h.tree.weight(wrapper, Orientation::Vertical));
        assert_eq!(1.0, h.weight(2, Orientation::Horizontal));
    }

    #[test]
    fn create_implicit_container() {
        let mut h = Harness::h(&[Window(1), Window(2), Window(3)]);
        h.focus(2);
        let outcome = h.move_through(2, Direction::Up);
        assert!(matches!(outcome, MoveOutcome::WrappedRoot { .. }), "{outcome:?}");
        assert_eq!(
            Workspace(vec![VTiles(vec![Window(2), HTiles(vec![Window(1), Window(3)])])]),
            h.workspace_shape()
        );
        assert!(h.tree.is_root_container(h.root()));
    }

    #[test]
    fn implicit_container_downwards_puts_window_last() {
        let mut h = Harness::h(&[Window(1), Window(2), Window(3)]);
        h.move_through(1, Direction::Down);
        assert_eq!(
            Workspace(vec![VTiles(vec![HTiles(vec![Window(2), Window(3)]), Window(1)])]),
            h.workspace_shape()
        );
    }

    #[test]
    fn implicit_container_flattens_old_root_with_one_child() {
        let mut h = Harness::h(&[Window(1), Window(2)]);
        h.move_through(1, Direction::Up);
        assert_eq!(Workspace(vec![VTiles(vec![Window(1), Window(2)])]), h.workspace_shape());
        assert!(h.tree.degenerate_containers().is_empty());
    }

    #[test]
    fn implicit_container_flattens_nested_single_child_root() {
        let mut h = Harness::h(&[HTiles(vec![Window(1), Window(2), Window(3)])]);
        h.move_through(1, Direction::Up);
        assert_eq!(
            Workspace(vec![VTiles(vec![Window(1), HTiles(vec![Window(2), Window(3)])])]),
            h.workspace_shape()
        );
        assert!(h.tree.degenerate_containers().is_empty());
    }

    #[test]
    fn move_out() {
        let mut h = Harness::h(&[Window(1), VTiles(vec![Window(2), Window(3), Window(4)])]);
        h.focus(2);
        let outcome = h.move_through(2, Direction::Left);
        assert_eq!(MoveOutcome::MovedOut { into: h.root() }, outcome);
        assert_eq!(
            HTiles(vec![Window(1), Window(2), VTiles(vec![Window(3), Window(4)])]),
            h.root_shape()
        );
    }

    #[test]
    fn move_out_forward_goes_after_container() {
        let mut h = Harness::h(&[VTiles(vec![Window(1), Window(2), Window(3)]), Window(4)]);
        h.move_through(2, Direction::Right);
        assert_eq!(
            HTiles(vec![VTiles(vec![Window(1), Window(3)]), Window(2), Window(4)]),
            h.root_shape()
        );
    }

    #[test]
    fn move_out_collapses_left_behind_container() {
        let mut h = Harness::h(&[Window(1), VTiles(vec![Window(2), Window(3)])]);
        let column = h.tree.parent(h.node(3)).unwrap();
        h.tree.set_weight(column, Orientation::Horizontal, 4.0).unwrap();
        h.move_through(2, Direction::Left);
        assert_eq!(HTiles(vec![Window(1), Window(2), Window(3)]), h.root_shape());
        assert_eq!(4.0, h.weight(3, Orientation::Horizontal));
        assert_eq!(1.0, h.weight(2, Orientation::Horizontal));
    }

    #[test]
    fn move_out_of_perpendicular_container() {
        let mut h = Harness::h(&[VTiles(vec![Window(1), HTiles(vec![Window(2), Window(3)])])]);
        h.move_through(3, Direction::Up);
        assert_eq!(
            Workspace(vec![VTiles(vec![Window(1), Window(3), Window(2)])]),
            h.workspace_shape()
        );
        assert!(h.tree.degenerate_containers().is_empty());
    }

    #[test]
    fn single_window_is_noop() {
        let mut h = Harness::h(&[Window(1)]);
        for direction in [Direction::Left, Direction::Right, Direction::Up, Direction::Down] {
            assert_eq!(MoveOutcome::NoOp, h.move_through(1, direction));
        }
        assert_eq!(HTiles(vec![Window(1)]), h.root_shape());
    }

    #[test]
    fn edge_of_matching_root_is_noop() {
        let mut h = Harness::h(&[Window(1), Window(2)]);
        let before = h.workspace_shape();
        assert_eq!(MoveOutcome::NoOp, h.move_through(1, Direction::Left));
        assert_eq!(MoveOutcome::NoOp, h.move_through(2, Direction::Right));
        assert_eq!(before, h.workspace_shape());
    }

    #[test]
    fn moved_window_becomes_most_recent() {
        let mut h = Harness::h(&[Window(1), VTiles(vec![Window(2), Window(3)])]);
        h.focus(3);
        h.move_through(1, Direction::Right);
        assert_eq!(h.node(1), h.tree.most_recent_leaf(h.root()));
        assert_eq!(Some(w(1)), h.tree.focused_window(h.ws));
    }

    #[test]
    fn accordion_keeps_weight_of_entering_window() {
        let mut h = Harness::h(&[Window(1), HAccordion(vec![Window(2), Window(3)])]);
        let node = h.node(1);
        h.tree.set_weight(node, Orientation::Horizontal, 2.0).unwrap();
        h.move_through(1, Direction::Right);
        assert_eq!(
            Workspace(vec![HAccordion(vec![Window(1), Window(2), Window(3)])]),
            h.workspace_shape()
        );
        assert_eq!(2.0, h.weight(1, Orientation::Horizontal));
        let accordion = h.tree.parent(h.node(1)).unwrap();
        assert_eq!(Some(LayoutMode::Accordion), h.tree.layout_mode(accordion));
        assert_eq!(Some(1.0), h.tree.proportion(h.node(1)));
    }

    #[test]
    fn workspaces_are_independent() {
        let mut h = Harness::h(&[Window(1), Window(2)]);
        let other = h.tree.create_workspace(LayoutKind::VerticalTiles);
        let other_root = h.tree.root_container(other).unwrap();
        h.tree.build_in(other_root, &[Window(3), Window(4)]).unwrap();

        h.move_through(3, Direction::Left);
        assert_eq!(HTiles(vec![Window(1), Window(2)]), h.root_shape());
        assert_eq!(
            Some(Workspace(vec![HTiles(vec![Window(3), Window(4)])])),
            h.tree.describe_workspace(other)
        );
        h.tree.verify_invariants();
    }
}

#[derive(Clone, Copy, Debug)]
enum TreeRandomOp {
    AddWindow,
    RemoveFocused,
    Focus(usize),
    Move(Direction),
    ToggleOrientation,
    ToggleMode,
}

fn arbitrary_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Left),
        Just(Direction::Right),
        Just(Direction::Up),
        Just(Direction::Down),
    ]
}

fn arbitrary_op() -> impl Strategy<Value = TreeRandomOp> {
    prop_oneof![
        2 => Just(TreeRandomOp::AddWindow),
        1 => Just(TreeRandomOp::RemoveFocused),
        2 => (0..16usize).prop_map(TreeRandomOp::Focus),
        6 => arbitrary_direction().prop_map(TreeRandomOp::Move),
        1 => Just(TreeRandomOp::ToggleOrientation),
        1 => Just(TreeRandomOp::ToggleMode),
    ]
}

fn apply_op(tree: &mut TilingTree, ws: WorkspaceId, op: TreeRandomOp, next_id: &mut u32) {
    let focused = tree.focused_window(ws);
    match op {
        TreeRandomOp::AddWindow => {
            let wid = w(*next_id);
            *next_id += 1;
            tree.add_window(ws, wid).unwrap();
            tree.focus_window(wid).unwrap();
        }
        TreeRandomOp::RemoveFocused => {
            if let Some(wid) = focused {
                tree.remove_window(wid).unwrap();
            }
        }
        TreeRandomOp::Focus(index) => {
            let windows = tree.windows_in(ws);
            if !windows.is_empty() {
                tree.focus_window(windows[index % windows.len()]).unwrap();
            }
        }
        TreeRandomOp::Move(direction) => {
            if let Some(wid) = focused {
                tree.move_through(wid, direction).unwrap();
            }
        }
        TreeRandomOp::ToggleOrientation | TreeRandomOp::ToggleMode => {
            let Some(node) = focused.and_then(|wid| tree.node_for_window(wid)) else { return };
            let parent = tree.parent(node).unwrap();
            let kind = tree.layout(parent).unwrap();
            let new_kind = match op {
                TreeRandomOp::ToggleOrientation => {
                    kind.with_orientation(kind.orientation().perpendicular())
                }
                _ if kind.is_tiles() => {
                    LayoutKind::new(kind.orientation(), LayoutMode::Accordion)
                }
                _ => LayoutKind::tiles(kind.orientation()),
            };
            tree.set_layout(parent, new_kind).unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn random_moves_keep_tree_normalized(
        ops in prop::collection::vec(arbitrary_op(), 1..80),
    ) {
        let mut tree = TilingTree::new();
        let ws = tree.create_workspace(LayoutKind::HorizontalTiles);
        let mut next_id = 1u32;
        apply_op(&mut tree, ws, TreeRandomOp::AddWindow, &mut next_id);

        for op in ops {
            let mut before = tree.windows_in(ws);
            apply_op(&mut tree, ws, op, &mut next_id);
            tree.verify_invariants();

            let degenerate = tree.degenerate_containers();
            prop_assert!(
                degenerate.is_empty(),
                "degenerate containers {:?} after {:?}:\n{}",
                degenerate,
                op,
                tree.draw_tree(ws),
            );

            if let TreeRandomOp::Move(_) = op {
                let mut after = tree.windows_in(ws);
                before.sort();
                after.sort();
                prop_assert_eq!(before, after, "move changed the set of windows");
            }

            let windows = tree.windows_in(ws);
            match tree.focused_window(ws) {
                Some(wid) => prop_assert!(windows.contains(&wid)),
                None => prop_assert!(windows.is_empty()),
            }
        }
    }
}
