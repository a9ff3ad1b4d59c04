/// A namespace binding opened by a start-namespace event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Namespace {
    pub prefix: String,
    pub uri: String,
}

/// The binding stack plus the queue of bindings opened but not yet declared
/// on an enclosing start tag.
#[derive(Debug, Default)]
struct NamespaceStack {
    stack: Vec<Namespace>,
    pending: Vec<Namespace>,
}

impl NamespaceStack {
    fn push(&mut self, prefix: Option<String>, uri: Option<String>) {
        let (prefix, uri) = match (prefix, uri) {
            (Some(prefix), Some(uri)) => (prefix, uri),
            _ => return,
        };
        let namespace = Namespace { prefix, uri };
        self.stack.push(namespace.clone());
        self.pending.push(namespace);
    }

    fn pop(&mut self, prefix: Option<&str>, uri: Option<&str>) {
        let (prefix, uri) = match (prefix, uri) {
            (Some(prefix), Some(uri)) => (prefix, uri),
            _ => return,
        };
        if let Some(index) = self
            .stack
            .iter()
            .rposition(|ns| ns.prefix == prefix && ns.uri == uri)
        {
            self.stack.remove(index);
        }
    }

    /// The most recently pushed prefix bound to `uri`, if any.
    fn prefix_for_uri(&self, uri: &str) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .find(|ns| ns.uri == uri)
            .map(|ns| ns.prefix.as_str())
    }

    fn consume_pending(&mut self) -> Vec<Namespace> {
        std::mem::take(&mut self.pending)
    }
}

/// A fully materialised attribute, ready for the translator.
#[derive(Clone, Debug)]
pub(crate) struct XmlAttribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// Consumes parse events and accumulates the textual document: tab
/// indentation, namespace declarations on their opening element, and
/// ` />` self-closing for childless tags.
pub(crate) struct XmlTranslator {
    out: String,
    namespaces: NamespaceStack,
    last_was_start_tag: bool,
    depth: usize,
}

impl XmlTranslator {
    pub(crate) fn new() -> Self {
        XmlTranslator {
            out: String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"),
            namespaces: NamespaceStack::default(),
            last_was_start_tag: false,
            depth: 0,
        }
    }

    pub(crate) fn on_namespace_start(&mut self, prefix: Option<String>, uri: Option<String>) {
        self.namespaces.push(prefix, uri);
    }

    pub(crate) fn on_namespace_end(&mut self, prefix: Option<&str>, uri: Option<&str>) {
        self.namespaces.pop(prefix, uri);
    }

    pub(crate) fn on_start_tag(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        attributes: &[XmlAttribute],
    ) {
        if self.last_was_start_tag {
            self.out.push_str(">\n");
        }
        self.append_indent();
        self.out.push('<');
        let prefix = namespace
            .and_then(|uri| self.namespaces.prefix_for_uri(uri))
            .map(str::to_string);
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            self.out.push_str(&prefix);
            self.out.push(':');
        }
        self.out.push_str(name);

        for ns in self.namespaces.consume_pending() {
            self.out.push_str(" xmlns:");
            self.out.push_str(&ns.prefix);
            self.out.push_str("=\"");
            self.out.push_str(&ns.uri);
            self.out.push('"');
        }

        for attribute in attributes {
            self.out.push(' ');
            let prefix = attribute
                .namespace
                .as_deref()
                .and_then(|uri| self.namespaces.prefix_for_uri(uri))
                .map(str::to_string);
            match prefix.filter(|p| !p.is_empty()) {
                Some(prefix) => {
                    self.out.push_str(&prefix);
                    self.out.push(':');
                }
                // No binding in scope: the raw namespace URI stands in as
                // the prefix, matching what aapt-era dumpers emit.
                None => {
                    if let Some(uri) = attribute.namespace.as_deref().filter(|u| !u.is_empty()) {
                        self.out.push_str(uri);
                        self.out.push(':');
                    }
                }
            }
            self.out.push_str(&attribute.name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_xml(&attribute.value));
            self.out.push('"');
        }

        self.last_was_start_tag = true;
        self.depth += 1;
    }

    pub(crate) fn on_end_tag(&mut self, namespace: Option<&str>, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        if self.last_was_start_tag {
            self.out.push_str(" />\n");
        } else {
            self.append_indent();
            self.out.push_str("</");
            let prefix = namespace
                .and_then(|uri| self.namespaces.prefix_for_uri(uri))
                .map(str::to_string);
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                self.out.push_str(&prefix);
                self.out.push(':');
            }
            self.out.push_str(name);
            self.out.push_str(">\n");
        }
        self.last_was_start_tag = false;
    }

    pub(crate) fn on_cdata(&mut self, data: &str) {
        if self.last_was_start_tag {
            self.out.push_str(">\n");
            self.last_was_start_tag = false;
        }
        self.append_indent();
        self.out.push_str(&escape_xml(data));
        self.out.push('\n');
    }

    fn append_indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
    }

    pub(crate) fn into_xml(self) -> String {
        self.out
    }
}

/// The five markup characters become entities; control characters below
/// 0x20 other than tab, newline and carriage return are dropped.
pub(crate) fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 16);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if c < '\u{20}' && c != '\t' && c != '\n' && c != '\r' => {}
            c => escaped.push(c),
        }
    }
    escaped
}
