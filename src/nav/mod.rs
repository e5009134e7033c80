//! Directional focus engine for remote-control style input.
//!
//! The engine never stores anything on the rendered widgets. It keeps its own
//! side table of the focusable elements and of the tile grid, rebuilt lazily
//! from whatever the [`Surface`] reports after the host calls
//! [`NavigationEngine::invalidate`].

mod grid;

use std::fmt::Debug;

use tracing::trace;

pub(crate) use grid::{Bounds, Direction, GridMetrics};
use grid::{GridCell, grid_step, index_grid, linear_step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// Buttons, inputs and other controls outside the tile grid.
    Control,
    /// Catalog or history tile; participates in the grid.
    Tile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementInfo<H> {
    pub(crate) handle: H,
    pub(crate) role: Role,
    pub(crate) bounds: Bounds,
    pub(crate) visible: bool,
    pub(crate) disabled: bool,
    /// Still focusable, but activation is swallowed (e.g. "previous" on page 1).
    pub(crate) inert: bool,
}

impl<H> ElementInfo<H> {
    pub(crate) fn control(handle: H, bounds: Bounds) -> Self {
        Self {
            handle,
            role: Role::Control,
            bounds,
            visible: true,
            disabled: false,
            inert: false,
        }
    }

    pub(crate) fn tile(handle: H, bounds: Bounds) -> Self {
        Self {
            role: Role::Tile,
            ..Self::control(handle, bounds)
        }
    }

    pub(crate) fn inert(mut self, inert: bool) -> Self {
        self.inert = inert;
        self
    }

    pub(crate) fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub(crate) fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// The host the engine drives focus on.
pub(crate) trait Surface {
    type Handle: Copy + Eq + Debug;

    /// Every candidate element, in document order.
    fn elements(&self) -> Vec<ElementInfo<Self::Handle>>;
    fn viewport(&self) -> Bounds;
    fn focus(&mut self, handle: Self::Handle);
    fn blur(&mut self, handle: Self::Handle);
    fn scroll_into_view(&mut self, handle: Self::Handle);
    fn click(&mut self, handle: Self::Handle);
}

#[derive(Debug)]
pub(crate) struct NavigationEngine<H> {
    metrics: GridMetrics,
    focusable: Vec<ElementInfo<H>>,
    grid: Vec<GridCell<H>>,
    current: Option<H>,
    enabled: bool,
    dirty: bool,
}

impl<H: Copy + Eq + Debug> NavigationEngine<H> {
    pub(crate) fn new(metrics: GridMetrics) -> Self {
        Self {
            metrics,
            focusable: Vec::new(),
            grid: Vec::new(),
            current: None,
            enabled: true,
            dirty: true,
        }
    }

    pub(crate) fn current(&self) -> Option<H> {
        self.current
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn enable(&mut self) {
        self.enabled = true;
    }

    pub(crate) fn disable(&mut self) {
        self.enabled = false;
    }

    /// Marks the indexes stale; the next query rebuilds them first.
    pub(crate) fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn rebuild<S>(&mut self, surface: &S)
    where
        S: Surface<Handle = H>,
    {
        self.focusable = surface
            .elements()
            .into_iter()
            .filter(|element| element.visible && !element.disabled)
            .collect();
        self.grid = index_grid(
            self.focusable
                .iter()
                .filter(|element| element.role == Role::Tile)
                .map(|element| (element.handle, element.bounds)),
            &self.metrics,
        );
        if let Some(current) = self.current
            && !self.focusable.iter().any(|element| element.handle == current)
        {
            self.current = None;
        }
        self.dirty = false;
        trace!(
            focusable = self.focusable.len(),
            tiles = self.grid.len(),
            "navigation index rebuilt"
        );
    }

    fn refresh<S>(&mut self, surface: &S)
    where
        S: Surface<Handle = H>,
    {
        if self.dirty {
            self.rebuild(surface);
        }
    }

    pub(crate) fn set_initial_focus<S>(&mut self, surface: &mut S)
    where
        S: Surface<Handle = H>,
    {
        self.refresh(surface);
        let viewport = surface.viewport();
        let target = self
            .grid
            .iter()
            .find(|cell| {
                cell.bounds.top >= viewport.top
                    && cell.bounds.top < viewport.bottom()
                    && cell.bounds.left >= viewport.left
            })
            .map(|cell| cell.handle)
            .or_else(|| self.focusable.first().map(|element| element.handle));
        if let Some(target) = target {
            self.move_focus(surface, target);
        }
    }

    /// Returns whether focus moved.
    pub(crate) fn navigate<S>(&mut self, surface: &mut S, direction: Direction) -> bool
    where
        S: Surface<Handle = H>,
    {
        if !self.enabled {
            return false;
        }
        self.refresh(surface);
        let Some(current) = self.current else {
            self.set_initial_focus(surface);
            return self.current.is_some();
        };

        let next = match self.grid.iter().position(|cell| cell.handle == current) {
            Some(from) => grid_step(&self.grid, from, direction, &self.metrics)
                .map(|index| self.grid[index].handle),
            None => {
                let boxes: Vec<Bounds> = self.focusable.iter().map(|e| e.bounds).collect();
                self.focusable
                    .iter()
                    .position(|element| element.handle == current)
                    .and_then(|from| linear_step(&boxes, from, direction))
                    .map(|index| self.focusable[index].handle)
            }
        };

        match next {
            Some(next) => {
                trace!(?direction, from = ?current, to = ?next, "focus moved");
                self.move_focus(surface, next);
                true
            }
            None => false,
        }
    }

    /// Clicks the current element unless it is inert. Returns whether a click
    /// was delivered.
    pub(crate) fn activate<S>(&mut self, surface: &mut S) -> bool
    where
        S: Surface<Handle = H>,
    {
        self.refresh(surface);
        let Some(current) = self.current else {
            return false;
        };
        let inert = self
            .focusable
            .iter()
            .find(|element| element.handle == current)
            .is_some_and(|element| element.inert);
        if inert {
            return false;
        }
        surface.click(current);
        true
    }

    /// Programmatic focus. Ignored when `handle` is not currently focusable.
    pub(crate) fn focus_handle<S>(&mut self, surface: &mut S, handle: H) -> bool
    where
        S: Surface<Handle = H>,
    {
        self.refresh(surface);
        if !self.focusable.iter().any(|element| element.handle == handle) {
            return false;
        }
        self.move_focus(surface, handle);
        true
    }

    fn move_focus<S>(&mut self, surface: &mut S, target: H)
    where
        S: Surface<Handle = H>,
    {
        if let Some(previous) = self.current.take() {
            surface.blur(previous);
        }
        self.current = Some(target);
        surface.focus(target);

        let viewport = surface.viewport();
        let fully_visible = self
            .focusable
            .iter()
            .find(|element| element.handle == target)
            .is_some_and(|element| viewport.contains(&element.bounds));
        if !fully_visible {
            surface.scroll_into_view(target);
            // Scrolling moves every box.
            self.dirty = true;
        }
    }
}
