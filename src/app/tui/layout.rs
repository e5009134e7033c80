//! Terminal geometry for each section, exposed to the navigation engine as a
//! [`Surface`]. Boxes are kept in content coordinates; the engine sees them
//! shifted by the vertical scroll offset, relative to the body area.

use ratatui::layout::Rect;

use crate::app::state::{AppState, Section};
use crate::nav::{Bounds, ElementInfo, GridMetrics, Surface};

pub(super) const TILE_WIDTH: i32 = 26;
pub(super) const TILE_HEIGHT: i32 = 5;
const COLUMN_STRIDE: i32 = TILE_WIDTH + 2;
const ROW_STRIDE: i32 = TILE_HEIGHT + 1;
const MARGIN: i32 = 2;
const BUTTON_HEIGHT: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Widget {
    SearchInput,
    SearchButton,
    HistoryButton,
    NewSearch,
    Tile(usize),
    PrevPage,
    NextPage,
    Back,
    Quality(usize),
    BackFromHistory,
    HistoryTile(usize),
    Close,
    SeekBack,
    PlayPause,
    SeekForward,
}

/// Tile-grid bucketing scaled to terminal cells.
pub(super) fn cell_metrics() -> GridMetrics {
    GridMetrics {
        tile_height: ROW_STRIDE,
        tile_width: COLUMN_STRIDE,
        align_tolerance: COLUMN_STRIDE / 2,
        closeness: 1,
    }
}

/// Everything that decides which widgets exist. A change means the focus
/// should start over; a resize alone only needs re-indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ViewKey {
    section: Section,
    query: String,
    page: u32,
    total_estimate: u32,
    results: usize,
    options: usize,
    history: usize,
}

impl ViewKey {
    pub(super) fn of(state: &AppState) -> Self {
        Self {
            section: state.section,
            query: state.active_query.clone(),
            page: state.pagination.current,
            total_estimate: state.pagination.total_estimate,
            results: state.results.len(),
            options: state.detail.as_ref().map_or(0, |detail| detail.options.len()),
            history: state.history.entries().len(),
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct Screen {
    content: Vec<ElementInfo<Widget>>,
    width: i32,
    height: i32,
    scroll: i32,
    focused: Option<Widget>,
    clicked: Option<Widget>,
}

impl Screen {
    /// Recomputes the widget boxes for `state` inside `body`.
    pub(super) fn layout(&mut self, state: &AppState, body: Rect) {
        self.width = i32::from(body.width);
        self.height = i32::from(body.height);
        self.content = match state.section {
            Section::Welcome => welcome(self.width),
            Section::MovieList => movie_list(state, self.width),
            Section::MovieDetail => movie_detail(state),
            Section::History => history(state, self.width),
            Section::Player => player(self.width),
        };
        let bottom = self
            .content
            .iter()
            .map(|element| element.bounds.bottom())
            .max()
            .unwrap_or(0);
        self.scroll = self.scroll.min((bottom - self.height).max(0));
    }

    pub(super) fn reset_scroll(&mut self) {
        self.scroll = 0;
    }

    pub(super) fn focused(&self) -> Option<Widget> {
        self.focused
    }

    pub(super) fn take_click(&mut self) -> Option<Widget> {
        self.clicked.take()
    }

    /// Moves a decoration placed in content coordinates into view coordinates.
    pub(super) fn to_view(&self, content: Bounds) -> Bounds {
        Bounds::new(content.left, content.top - self.scroll, content.width, content.height)
    }

    /// Boxes relative to the body area, as the engine sees them.
    pub(super) fn visible_elements(&self) -> impl Iterator<Item = ElementInfo<Widget>> + '_ {
        let viewport = self.viewport();
        self.elements()
            .into_iter()
            .filter(move |element| element.visible && overlaps(&viewport, &element.bounds))
    }
}

impl Surface for Screen {
    type Handle = Widget;

    fn elements(&self) -> Vec<ElementInfo<Widget>> {
        self.content
            .iter()
            .cloned()
            .map(|mut element| {
                element.bounds.top -= self.scroll;
                element
            })
            .collect()
    }

    fn viewport(&self) -> Bounds {
        Bounds::new(0, 0, self.width, self.height)
    }

    fn focus(&mut self, handle: Widget) {
        self.focused = Some(handle);
    }

    fn blur(&mut self, handle: Widget) {
        if self.focused == Some(handle) {
            self.focused = None;
        }
    }

    fn scroll_into_view(&mut self, handle: Widget) {
        let Some(element) = self.content.iter().find(|element| element.handle == handle) else {
            return;
        };
        let bounds = element.bounds;
        if bounds.top < self.scroll {
            self.scroll = (bounds.top - 1).max(0);
        } else if bounds.bottom() > self.scroll + self.height {
            self.scroll = bounds.bottom() - self.height + 1;
        }
    }

    fn click(&mut self, handle: Widget) {
        self.clicked = Some(handle);
    }
}

fn overlaps(viewport: &Bounds, bounds: &Bounds) -> bool {
    bounds.bottom() > viewport.top
        && bounds.top < viewport.bottom()
        && bounds.right() > viewport.left
        && bounds.left < viewport.right()
}

fn columns_for(width: i32) -> i32 {
    ((width - MARGIN) / COLUMN_STRIDE).max(1)
}

/// Lays `count` tiles out row by row starting at `top`; returns the first
/// free line below them.
fn tile_grid(
    elements: &mut Vec<ElementInfo<Widget>>,
    count: usize,
    width: i32,
    top: i32,
    handle: impl Fn(usize) -> Widget,
) -> i32 {
    let columns = columns_for(width) as usize;
    for index in 0..count {
        let row = (index / columns) as i32;
        let column = (index % columns) as i32;
        elements.push(ElementInfo::tile(
            handle(index),
            Bounds::new(
                MARGIN + column * COLUMN_STRIDE,
                top + row * ROW_STRIDE,
                TILE_WIDTH,
                TILE_HEIGHT,
            ),
        ));
    }
    let rows = count.div_ceil(columns) as i32;
    top + rows * ROW_STRIDE
}

fn welcome(width: i32) -> Vec<ElementInfo<Widget>> {
    let input_width = (width - 2 * MARGIN).clamp(10, 60);
    vec![
        ElementInfo::control(Widget::SearchInput, Bounds::new(MARGIN, 1, input_width, BUTTON_HEIGHT)),
        ElementInfo::control(Widget::SearchButton, Bounds::new(MARGIN, 5, 12, BUTTON_HEIGHT)),
        ElementInfo::control(Widget::HistoryButton, Bounds::new(MARGIN + 14, 5, 14, BUTTON_HEIGHT)),
    ]
}

fn movie_list(state: &AppState, width: i32) -> Vec<ElementInfo<Widget>> {
    let mut elements = vec![ElementInfo::control(
        Widget::NewSearch,
        Bounds::new(MARGIN, 0, 16, BUTTON_HEIGHT),
    )];
    let below = tile_grid(&mut elements, state.results.len(), width, 4, Widget::Tile);
    let paged = state.pagination.total_estimate > 1;
    elements.push(
        ElementInfo::control(Widget::PrevPage, Bounds::new(MARGIN, below, 12, BUTTON_HEIGHT))
            .visible(paged)
            .inert(!state.pagination.has_previous()),
    );
    elements.push(
        ElementInfo::control(Widget::NextPage, Bounds::new(MARGIN + 14, below, 12, BUTTON_HEIGHT))
            .visible(paged)
            .inert(!state.pagination.has_next()),
    );
    elements
}

fn movie_detail(state: &AppState) -> Vec<ElementInfo<Widget>> {
    let mut elements = vec![ElementInfo::control(
        Widget::Back,
        Bounds::new(MARGIN, 0, 10, BUTTON_HEIGHT),
    )];
    let options = state.detail.as_ref().map_or(0, |detail| detail.options.len());
    for index in 0..options {
        elements.push(ElementInfo::control(
            Widget::Quality(index),
            Bounds::new(MARGIN, 6 + index as i32 * 4, 40, BUTTON_HEIGHT),
        ));
    }
    elements
}

fn history(state: &AppState, width: i32) -> Vec<ElementInfo<Widget>> {
    let mut elements = vec![ElementInfo::control(
        Widget::BackFromHistory,
        Bounds::new(MARGIN, 0, 10, BUTTON_HEIGHT),
    )];
    tile_grid(
        &mut elements,
        state.history.entries().len(),
        width,
        4,
        Widget::HistoryTile,
    );
    elements
}

fn player(width: i32) -> Vec<ElementInfo<Widget>> {
    let row_width = 3 * 14 + 2 * 2;
    let left = ((width - row_width) / 2).max(MARGIN);
    vec![
        ElementInfo::control(Widget::Close, Bounds::new(MARGIN, 0, 11, BUTTON_HEIGHT)),
        ElementInfo::control(Widget::SeekBack, Bounds::new(left, 8, 14, BUTTON_HEIGHT)),
        ElementInfo::control(Widget::PlayPause, Bounds::new(left + 16, 8, 14, BUTTON_HEIGHT)),
        ElementInfo::control(Widget::SeekForward, Bounds::new(left + 32, 8, 14, BUTTON_HEIGHT)),
    ]
}
