//! Menu item descriptors and the projection pass that assigns the native
//! command identifiers a popup menu is built from.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Reserved label marking a non-interactive separator row. A separator
/// ignores every other field of its [`MenuItem`].
pub const SEPARATOR: &str = "-";

/// First native command identifier handed out during projection. Everything
/// below this range is left to the OS.
pub const ID_FIRST: u32 = 1000;

type Callback = Rc<dyn Fn(&MenuItem)>;

/// One entry of a tray context menu.
///
/// Items form an ordered tree. Callbacks run synchronously on the thread
/// driving [`TrayHost::pump`](crate::TrayHost::pump), with the selected
/// item's descriptor as argument.
#[derive(Clone, Default)]
pub struct MenuItem {
    pub label: String,
    pub disabled: bool,
    pub checked: bool,
    pub checkbox: bool,
    pub(crate) callback: Option<Callback>,
    pub submenu: Vec<MenuItem>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn separator() -> Self {
        Self::new(SEPARATOR)
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Render the item as a checkbox with the given check state.
    pub fn checkbox(mut self, checked: bool) -> Self {
        self.checkbox = true;
        self.checked = checked;
        self
    }

    pub fn on_select(mut self, callback: impl Fn(&MenuItem) + 'static) -> Self {
        self.callback = Some(Rc::new(callback));
        self
    }

    pub fn submenu(mut self, children: Vec<MenuItem>) -> Self {
        self.submenu = children;
        self
    }

    pub fn is_separator(&self) -> bool {
        self.label == SEPARATOR
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("label", &self.label)
            .field("disabled", &self.disabled)
            .field("checked", &self.checked)
            .field("checkbox", &self.checkbox)
            .field("callback", &self.callback.is_some())
            .field("submenu", &self.submenu)
            .finish()
    }
}

/// A menu row with its assigned native command identifier, ready for a
/// platform backend to realize.
#[derive(Debug)]
pub enum NativeNode {
    Separator,
    Command {
        id: u32,
        label: String,
        disabled: bool,
        checked: bool,
        submenu: Vec<NativeNode>,
    },
}

/// Projection output: the native menu shape plus the arena resolving a
/// delivered command identifier back to its source descriptor.
pub struct MenuLayout {
    pub nodes: Vec<NativeNode>,
    pub arena: HashMap<u32, MenuItem>,
}

/// Walk the descriptor tree pre-order, handing out identifiers from a
/// single counter starting at [`ID_FIRST`].
///
/// Every row consumes one identifier, separators included, so one counter
/// threaded through the recursion keeps the whole tree collision-free;
/// only command rows enter the arena.
pub fn project(items: &[MenuItem]) -> MenuLayout {
    let mut arena = HashMap::new();
    let mut next_id = ID_FIRST;
    let nodes = project_level(items, &mut next_id, &mut arena);
    MenuLayout { nodes, arena }
}

fn project_level(
    items: &[MenuItem],
    next_id: &mut u32,
    arena: &mut HashMap<u32, MenuItem>,
) -> Vec<NativeNode> {
    items
        .iter()
        .map(|item| {
            let id = *next_id;
            *next_id += 1;
            if item.is_separator() {
                NativeNode::Separator
            } else {
                let submenu = project_level(&item.submenu, next_id, arena);
                arena.insert(id, item.clone());
                NativeNode::Command {
                    id,
                    label: item.label.clone(),
                    disabled: item.disabled,
                    checked: item.checked,
                    submenu,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn flatten_ids(nodes: &[NativeNode], out: &mut Vec<u32>) {
        for node in nodes {
            if let NativeNode::Command { id, submenu, .. } = node {
                out.push(*id);
                flatten_ids(submenu, out);
            }
        }
    }

    #[test]
    fn identifiers_are_unique_and_preorder() {
        let items = vec![
            MenuItem::new("File").submenu(vec![
                MenuItem::new("Open"),
                MenuItem::new("Recent").submenu(vec![MenuItem::new("a.txt")]),
            ]),
            MenuItem::new("Edit"),
        ];

        let layout = project(&items);
        let mut ids = Vec::new();
        flatten_ids(&layout.nodes, &mut ids);

        assert_eq!(ids.first(), Some(&ID_FIRST));
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        // Strictly increasing pre-order: flattening already yields them sorted.
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn submenu_children_follow_their_parent_identifier() {
        let items = vec![
            MenuItem::new("File").submenu(vec![MenuItem::new("Open"), MenuItem::new("Save")]),
            MenuItem::new("Quit"),
        ];

        let layout = project(&items);
        let mut ids = Vec::new();
        flatten_ids(&layout.nodes, &mut ids);

        // Parent, its two children, then the next sibling.
        assert_eq!(ids, vec![1000, 1001, 1002, 1003]);
    }

    #[test]
    fn separators_consume_identifiers_but_stay_out_of_the_arena() {
        let items = vec![
            MenuItem::new("Open"),
            MenuItem::separator(),
            MenuItem::new("Quit"),
        ];

        let layout = project(&items);
        assert!(matches!(layout.nodes[1], NativeNode::Separator));
        assert_eq!(layout.arena.len(), 2);
        assert_eq!(layout.arena[&1000].label, "Open");
        assert!(!layout.arena.contains_key(&1001));
        assert_eq!(layout.arena[&1002].label, "Quit");
    }

    #[test]
    fn arena_entries_keep_their_callbacks() {
        let fired = Rc::new(Cell::new(0u32));
        let items = vec![
            MenuItem::new("Open"),
            MenuItem::separator(),
            MenuItem::new("Quit").on_select({
                let fired = fired.clone();
                move |_| fired.set(fired.get() + 1)
            }),
        ];

        let layout = project(&items);
        let quit = &layout.arena[&1002];
        let callback = quit.callback.clone().expect("Quit carries a callback");
        callback(quit);
        assert_eq!(fired.get(), 1);
        assert!(layout.arena[&1000].callback.is_none());
    }

    #[test]
    fn display_state_survives_projection() {
        let items = vec![MenuItem::new("Muted").checkbox(true).disabled(true)];

        let layout = project(&items);
        match &layout.nodes[0] {
            NativeNode::Command {
                label,
                disabled,
                checked,
                ..
            } => {
                assert_eq!(label, "Muted");
                assert!(*disabled);
                assert!(*checked);
            }
            other => panic!("expected a command row, got {other:?}"),
        }
    }

    #[test]
    fn empty_tree_projects_to_empty_layout() {
        let layout = project(&[]);
        assert!(layout.nodes.is_empty());
        assert!(layout.arena.is_empty());
    }
}
