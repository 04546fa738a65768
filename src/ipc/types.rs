use swayipc_async::{Event, Node, NodeType, WindowChange, WorkspaceChange};

/// The window-manager facts rule resolution needs about a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub id: i64,
    pub app_id: Option<String>,
    /// Window class, XWayland only
    pub class: Option<String>,
    pub visible: bool,
}

impl From<&Node> for ContainerRef {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            app_id: node.app_id.clone(),
            class: node
                .window_properties
                .as_ref()
                .and_then(|p| p.class.clone()),
            visible: node.visible.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRef {
    pub id: i64,
    pub name: Option<String>,
}

impl From<&Node> for WorkspaceRef {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
        }
    }
}

/// The sway events the fader acts on; everything else is `Other`
#[derive(Debug, Clone, PartialEq)]
pub enum SwayEvent {
    WindowNew(ContainerRef),
    /// `None` when sway reports no current workspace
    WorkspaceFocus(Option<WorkspaceRef>),
    Other,
}

impl From<Event> for SwayEvent {
    fn from(event: Event) -> Self {
        match event {
            Event::Window(event) if matches!(event.change, WindowChange::New) => {
                SwayEvent::WindowNew(ContainerRef::from(&event.container))
            }
            Event::Workspace(event) if matches!(event.change, WorkspaceChange::Focus) => {
                SwayEvent::WorkspaceFocus(event.current.as_ref().map(WorkspaceRef::from))
            }
            _ => SwayEvent::Other,
        }
    }
}

fn is_container(node: &Node) -> bool {
    matches!(node.node_type, NodeType::Con | NodeType::FloatingCon)
}

/// Every visible tiling or floating container below `root`.
///
/// Pre-order: a node, then its children, then its floating children.
pub fn visible_containers(root: &Node) -> Vec<ContainerRef> {
    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if is_container(node) && node.visible.unwrap_or(false) {
            found.push(ContainerRef::from(node));
        }
        // Pushed in reverse so the first child is visited next
        stack.extend(node.floating_nodes.iter().rev());
        stack.extend(node.nodes.iter().rev());
    }

    found
}
