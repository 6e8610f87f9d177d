//! Minimal model of the page a content script sees: a head holding style
//! elements and a body tree whose nodes carry their computed visibility.

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Display {
    #[default]
    Block,
    Inline,
    None,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub visibility: Visibility,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            visibility: Visibility::Visible,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub text: String,
    pub style: ComputedStyle,
    /// False when the element produces no layout box (e.g. `position: fixed`
    /// detached content or an element inside a collapsed subtree).
    pub rendered: bool,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            text: String::new(),
            style: ComputedStyle::default(),
            rendered: true,
            children: Vec::new(),
        }
    }

    pub fn with_text(tag: &str, text: &str) -> Self {
        let mut element = Self::new(tag);
        element.text = text.to_string();
        element
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn display(mut self, display: Display) -> Self {
        self.style.display = display;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.style.visibility = visibility;
        self
    }

    pub fn detached(mut self) -> Self {
        self.rendered = false;
        self
    }

    /// Own text followed by every descendant's text, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleElement {
    pub id: String,
    pub text_content: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub head: Vec<StyleElement>,
    pub body: Vec<Element>,
}

impl Document {
    pub fn new(body: Vec<Element>) -> Self {
        Self {
            head: Vec::new(),
            body,
        }
    }

    pub fn style_by_id(&self, id: &str) -> Option<&StyleElement> {
        self.head.iter().find(|style| style.id == id)
    }

    pub fn count_styles_with_id(&self, id: &str) -> usize {
        self.head.iter().filter(|style| style.id == id).count()
    }

    /// Removes the first style element carrying `id`, returning whether one existed.
    pub fn remove_style(&mut self, id: &str) -> bool {
        match self.head.iter().position(|style| style.id == id) {
            Some(index) => {
                self.head.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn append_style(&mut self, style: StyleElement) {
        self.head.push(style);
    }
}
