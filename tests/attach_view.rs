mod fixtures;

use std::cell::Cell;
use std::rc::Rc;

use fixtures::{data, element, interp, partial, text, TestView};
use serde_json::json;
use trellis::{
    dom_to_html, DomElement, DomNode, Node, PartialRegistry, Template, View, VNode,
};

fn todo_view() -> Rc<dyn View> {
    let mut view = TestView::new("div");
    view.children = vec![(
        "todo-item".to_string(),
        Rc::new(TestView::nested("li")) as Rc<dyn View>,
    )];
    Rc::new(view)
}

fn list_template() -> Template {
    Template::new(Node::Fragment(vec![element(
        "ul",
        &[],
        vec![element(
            "li",
            &[("class", "todo-item")],
            vec![interp("title")],
        )],
    )]))
}

#[test]
#[ntest::timeout(100)]
fn test_attach_replaces_matching_class_with_widget() {
    let registry = PartialRegistry::new();
    let attached = list_template().attach_view(todo_view(), &registry);

    let Node::Element(wrapper) = attached.node() else {
        panic!("expected the synthetic root wrapper, got {:?}", attached.node());
    };
    assert_eq!(wrapper.tag, "div", "wrapper matches the mount element");

    let Node::Element(ul) = &wrapper.children[0] else {
        panic!("expected the list element, got {:?}", wrapper.children[0]);
    };
    let Node::Widget(binding) = &ul.children[0] else {
        panic!("expected a widget, got {:?}", ul.children[0]);
    };
    assert_eq!(binding.child.tag_name(), "li");

    // The widget captured the original element subtree as its template.
    let Node::Element(captured) = binding.template.node() else {
        panic!("expected the captured element");
    };
    assert_eq!(captured.tag, "li");
    assert_eq!(captured.children, vec![interp("title")]);
}

#[test]
#[ntest::timeout(100)]
fn test_attach_never_mutates_the_original_tree() {
    let registry = PartialRegistry::new();
    let template = list_template();
    let before = template.node().clone();

    let _once = template.attach_view(todo_view(), &registry);
    let _twice = template.attach_view(todo_view(), &registry);

    assert_eq!(template.node(), &before);
}

#[test]
#[ntest::timeout(100)]
fn test_widgets_bind_only_under_an_owning_view() {
    let registry = PartialRegistry::new();
    let attached = list_template().attach_view(todo_view(), &registry);
    let ctx = data(json!({ "title": "Buy milk" }));

    // The virtual tree carries the bound widget.
    let vtree = attached.to_vtree(&ctx, &registry, true);
    let VNode::Element(wrapper) = &vtree[0] else {
        panic!("expected the wrapper element");
    };
    let VNode::Element(ul) = &wrapper.children[0] else {
        panic!("expected the list element");
    };
    assert!(
        matches!(ul.children[0], VNode::Widget(_)),
        "expected a bound widget, got {:?}",
        ul.children[0]
    );

    // String rendering has no owning view, so the subtree renders inline.
    assert_eq!(
        attached.to_html(&ctx, &registry),
        "<div><ul><li class=\"todo-item\">Buy milk</li></ul></div>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_to_dom_unwraps_the_root_wrapper() {
    let registry = PartialRegistry::new();
    let attached = list_template().attach_view(todo_view(), &registry);

    let dom = attached.to_dom(&data(json!({ "title": "Buy milk" })), &registry);
    assert_eq!(
        dom_to_html(&dom),
        "<ul><li class=\"todo-item\">Buy milk</li></ul>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_first_declared_child_class_wins() {
    let registry = PartialRegistry::new();
    let mut view = TestView::new("div");
    view.children = vec![
        (
            "b".to_string(),
            Rc::new(TestView::nested("x-b")) as Rc<dyn View>,
        ),
        (
            "a".to_string(),
            Rc::new(TestView::nested("x-a")) as Rc<dyn View>,
        ),
    ];
    let template = Template::new(Node::Fragment(vec![element(
        "span",
        &[("class", "a b")],
        vec![],
    )]));

    let attached = template.attach_view(Rc::new(view), &registry);
    let Node::Element(wrapper) = attached.node() else {
        panic!("expected the wrapper element");
    };
    let Node::Widget(binding) = &wrapper.children[0] else {
        panic!("expected a widget, got {:?}", wrapper.children[0]);
    };
    assert_eq!(
        binding.child.tag_name(),
        "x-b",
        "declaration order decides match precedence"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_attach_expands_static_partials_without_touching_them() {
    let registry = PartialRegistry::new();
    let row = Template::new(Node::Fragment(vec![element(
        "li",
        &[("class", "todo-item")],
        vec![text("row")],
    )]));
    row.register("row", &registry);
    let row_before = row.node().clone();

    let template = Template::new(Node::Fragment(vec![element(
        "ul",
        &[],
        vec![partial("row")],
    )]));
    let attached = template.attach_view(todo_view(), &registry);

    let Node::Element(wrapper) = attached.node() else {
        panic!("expected the wrapper element");
    };
    let Node::Element(ul) = &wrapper.children[0] else {
        panic!("expected the list element");
    };
    assert!(
        matches!(ul.children[0], Node::Widget(_)),
        "the expanded partial's element must have matched, got {:?}",
        ul.children[0]
    );

    // The shared partial template is untouched by the expansion.
    assert_eq!(row.node(), &row_before);
    assert_eq!(
        registry.get("row").expect("registered partial").node(),
        &row_before
    );
}

#[test]
#[ntest::timeout(100)]
fn test_attach_defers_dynamic_partials() {
    let registry = PartialRegistry::new();
    let template = Template::new(Node::Fragment(vec![partial("dyn_row")]));

    let attached = template.attach_view(todo_view(), &registry);
    let Node::Element(wrapper) = attached.node() else {
        panic!("expected the wrapper element");
    };
    assert_eq!(
        wrapper.children[0],
        partial("dyn_row"),
        "dynamic markers resolve at render time, not attach time"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_dynamic_partial_attaches_on_first_render() {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let registry = PartialRegistry::with_resolver(move |_| {
        seen.set(seen.get() + 1);
        Some(Template::new(Node::Fragment(vec![element(
            "li",
            &[("class", "todo-item")],
            vec![text("dyn row")],
        )])))
    });

    let template = Template::new(Node::Fragment(vec![partial("dyn_row")]));
    let attached = template.attach_view(todo_view(), &registry);
    let ctx = data(json!({ "dynamic_partials": { "row": "row_tpl" } }));

    let vtree = attached.to_vtree(&ctx, &registry, true);
    let VNode::Element(wrapper) = &vtree[0] else {
        panic!("expected the wrapper element");
    };
    assert!(
        matches!(wrapper.children[0], VNode::Widget(_)),
        "the resolved partial's element must bind, got {:?}",
        wrapper.children[0]
    );

    // The attached version is cached for subsequent renders.
    assert!(registry.get("row_tpl").expect("cached partial").view().is_some());
    let _again = attached.to_vtree(&ctx, &registry, false);
    assert_eq!(calls.get(), 1);
}

#[test]
#[ntest::timeout(100)]
fn test_nested_view_attaches_without_a_wrapper() {
    let registry = PartialRegistry::new();
    let mut view = TestView::nested("li");
    view.children = vec![(
        "badge".to_string(),
        Rc::new(TestView::nested("span")) as Rc<dyn View>,
    )];

    // The root element itself is never replaced, only descendants.
    let template = Template::new(element(
        "li",
        &[("class", "badge")],
        vec![element("span", &[("class", "badge")], vec![])],
    ));
    let attached = template.attach_view(Rc::new(view), &registry);

    let Node::Element(root) = attached.node() else {
        panic!("expected the root element, got {:?}", attached.node());
    };
    assert_eq!(root.tag, "li", "no wrapper for nested views");
    assert!(
        matches!(root.children[0], Node::Widget(_)),
        "the inner element must still match, got {:?}",
        root.children[0]
    );
}

#[test]
#[ntest::timeout(100)]
fn test_mount_whitespace_reconciliation() {
    let registry = PartialRegistry::new();

    let mut mount = DomElement::new("div");
    mount.children = vec![
        DomNode::Text("\n  ".to_string()),
        DomNode::Element(DomElement::new("ul").shared()),
        DomNode::Text("\n".to_string()),
    ];
    let mount = mount.shared();

    let mut view = TestView::new("div");
    view.mount = Some(Rc::clone(&mount));

    let template = Template::new(Node::Fragment(vec![element("ul", &[], vec![])]));
    let _attached = template.attach_view(Rc::new(view), &registry);

    assert_eq!(
        mount.borrow().children.len(),
        1,
        "stray whitespace text nodes around the template are trimmed"
    );
}
