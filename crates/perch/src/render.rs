use auk::renderer::HtmlElementRenderer;
use auk::*;

use crate::paginate::{PageLinks, PaginatorState};
use crate::taxonomy::{Crumb, Crumbs};

/// Renders an element tree to a string of HTML.
pub fn render_to_string(element: &HtmlElement) -> Result<String, std::fmt::Error> {
    HtmlElementRenderer::new().render_to_string(element)
}

/// A breadcrumb trail. The current entry is not a link.
pub fn crumbs_template(crumbs: &Crumbs) -> HtmlElement {
    nav()
        .class("crumbs")
        .attr("aria-label", "Breadcrumb")
        .child(ol().children(crumbs.iter().map(|crumb| li().child(crumb_template(crumb)))))
}

fn crumb_template(crumb: &Crumb) -> HtmlElement {
    if crumb.is_current {
        span()
            .attr("aria-current", "page")
            .attr("title", crumb.tooltip.as_str())
            .child(crumb.label.as_str())
    } else {
        a().href(crumb.url.as_str())
            .attr("title", crumb.tooltip.as_str())
            .child(crumb.label.as_str())
    }
}

/// A page bar: previous, the first page, the window of pages around the
/// current one, the last page, and next.
pub fn page_bar_template(state: &PaginatorState, links: &PageLinks) -> HtmlElement {
    let mut items = Vec::new();

    if let Some(prev) = state.prev_page() {
        items.push(li().child(page_link(links, prev).attr("rel", "prev").child("Previous")));
    }

    if state.shows_first() {
        items.push(li().child(page_link(links, 1).child("1")));
        if *state.display_range.start() > 2 {
            items.push(ellipsis());
        }
    }

    items.extend(state.pages().map(|page| {
        if page == state.current_page {
            li().class("current")
                .child(span().attr("aria-current", "page").child(page.to_string()))
        } else {
            li().child(page_link(links, page).child(page.to_string()))
        }
    }));

    if state.shows_last() {
        if *state.display_range.end() + 1 < state.total_pages {
            items.push(ellipsis());
        }
        let last = state.total_pages;
        items.push(li().child(page_link(links, last).child(last.to_string())));
    }

    if let Some(next) = state.next_page() {
        items.push(li().child(page_link(links, next).attr("rel", "next").child("Next")));
    }

    nav()
        .class("page-bar")
        .attr("aria-label", "Pagination")
        .child(ul().children(items))
}

fn page_link(links: &PageLinks, page: usize) -> HtmlElement {
    a().href(links.url(page))
}

fn ellipsis() -> HtmlElement {
    li().class("ellipsis").child("…")
}
