use std::collections::HashSet;

use super::NodeId;

/// Lets a visitor control the walk from inside the callback
#[derive(Debug, Default)]
pub struct TraversalActions {
  skipped: bool,
  stopped: bool,
}

impl TraversalActions {
  /// Do not walk past the node currently being visited
  pub fn skip_children(&mut self) {
    self.skipped = true;
  }

  /// Abort the whole traversal after the current visit returns
  pub fn stop(&mut self) {
    self.stopped = true;
  }
}

struct Frame<C> {
  node_id: NodeId,
  children: Vec<NodeId>,
  next: usize,
  context: Option<C>,
}

/// Pre-order depth first walk starting at `start`.
///
/// `get_children` decides the direction of the walk, and `should_visit_child` is asked about each
/// edge right before the walk would cross it. Each node is visited at most once.
///
/// The value a visitor returns becomes the context handed to the nodes reached through it. When
/// the visitor returns `None` the context of the parent is passed along unchanged.
///
/// Returns the context of the node that stopped the traversal, if any.
pub fn depth_first<S, C>(
  state: &mut S,
  start: NodeId,
  get_children: impl Fn(&S, NodeId) -> Vec<NodeId>,
  mut should_visit_child: impl FnMut(&mut S, NodeId, NodeId) -> bool,
  mut visit: impl FnMut(&mut S, NodeId, Option<&C>, &mut TraversalActions) -> Option<C>,
) -> Option<C>
where
  S: ?Sized,
  C: Clone,
{
  let mut visited = HashSet::new();
  visited.insert(start);

  let mut actions = TraversalActions::default();
  let context = visit(state, start, None, &mut actions);
  if actions.stopped {
    return context;
  }

  if actions.skipped {
    return None;
  }

  let mut stack = vec![Frame {
    node_id: start,
    children: get_children(state, start),
    next: 0,
    context,
  }];

  while let Some(frame) = stack.last_mut() {
    let Some(&child) = frame.children.get(frame.next) else {
      stack.pop();
      continue;
    };

    frame.next += 1;
    let parent = frame.node_id;
    let parent_context = frame.context.clone();

    if visited.contains(&child) || !should_visit_child(state, parent, child) {
      continue;
    }

    visited.insert(child);

    let mut actions = TraversalActions::default();
    let context = visit(state, child, parent_context.as_ref(), &mut actions).or(parent_context);

    if actions.stopped {
      return context;
    }

    if actions.skipped {
      continue;
    }

    stack.push(Frame {
      node_id: child,
      children: get_children(state, child),
      next: 0,
      context,
    });
  }

  None
}
