use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use std::io::Cursor;

/// `(file index, line, column)` as written into a report
pub type Loc = (usize, u32, u32);

struct PlistWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl PlistWriter {
    fn new() -> Self {
        let writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        Self { writer }
    }

    fn event(&mut self, event: Event<'_>) {
        self.writer
            .write_event(event)
            .expect("Failed to write plist event");
    }

    fn start(&mut self, name: &str) {
        self.event(Event::Start(BytesStart::new(name)));
    }

    fn end(&mut self, name: &str) {
        self.event(Event::End(BytesEnd::new(name)));
    }

    fn text_element(&mut self, name: &str, content: &str) {
        self.start(name);
        self.event(Event::Text(BytesText::new(content)));
        self.end(name);
    }

    fn key(&mut self, name: &str) {
        self.text_element("key", name);
    }

    fn string(&mut self, key: &str, value: &str) {
        self.key(key);
        self.text_element("string", value);
    }

    fn integer(&mut self, key: &str, value: u64) {
        self.key(key);
        self.text_element("integer", &value.to_string());
    }

    fn location(&mut self, loc: Loc) {
        let (file, line, col) = loc;
        self.start("dict");
        self.integer("line", line as u64);
        self.integer("col", col as u64);
        self.integer("file", file as u64);
        self.end("dict");
    }

    fn finish(self) -> String {
        String::from_utf8(self.writer.into_inner().into_inner()).expect("plist is valid UTF-8")
    }
}

#[derive(Debug, Clone)]
pub struct EventFixture {
    message: String,
    location: Loc,
    extended_message: Option<String>,
    ranges: Vec<(Loc, Loc)>,
}

impl EventFixture {
    pub fn new(message: &str, location: Loc) -> Self {
        Self {
            message: message.to_string(),
            location,
            extended_message: None,
            ranges: Vec::new(),
        }
    }

    pub fn range(mut self, start: Loc, end: Loc) -> Self {
        self.ranges.push((start, end));
        self
    }

    pub fn extended_message(mut self, message: &str) -> Self {
        self.extended_message = Some(message.to_string());
        self
    }
}

#[derive(Debug, Clone)]
enum PathFixture {
    Control,
    Event(EventFixture),
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct DiagnosticFixture {
    description: String,
    location: Loc,
    category: String,
    check_name: Option<String>,
    path: Vec<PathFixture>,
}

impl DiagnosticFixture {
    pub fn new(description: &str, location: Loc) -> Self {
        Self {
            description: description.to_string(),
            location,
            category: "Logic error".to_string(),
            check_name: None,
            path: Vec::new(),
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn check_name(mut self, check_name: &str) -> Self {
        self.check_name = Some(check_name.to_string());
        self
    }

    /// Appends a control element with a single edge
    pub fn control(mut self) -> Self {
        self.path.push(PathFixture::Control);
        self
    }

    pub fn event(mut self, event: EventFixture) -> Self {
        self.path.push(PathFixture::Event(event));
        self
    }

    /// Appends a path element with an arbitrary `kind` tag
    pub fn raw_path_element(mut self, kind: &str) -> Self {
        self.path.push(PathFixture::Raw(kind.to_string()));
        self
    }

    fn write(&self, out: &mut PlistWriter) {
        out.start("dict");
        out.key("path");
        out.start("array");
        for element in &self.path {
            out.start("dict");
            match element {
                PathFixture::Control => {
                    out.string("kind", "control");
                    out.key("edges");
                    out.start("array");
                    out.start("dict");
                    out.key("start");
                    out.start("array");
                    out.location(self.location);
                    out.end("array");
                    out.key("end");
                    out.start("array");
                    out.location(self.location);
                    out.end("array");
                    out.end("dict");
                    out.end("array");
                }
                PathFixture::Event(event) => {
                    out.string("kind", "event");
                    out.key("location");
                    out.location(event.location);
                    if !event.ranges.is_empty() {
                        out.key("ranges");
                        out.start("array");
                        for (start, end) in &event.ranges {
                            out.start("array");
                            out.location(*start);
                            out.location(*end);
                            out.end("array");
                        }
                        out.end("array");
                    }
                    out.integer("depth", 0);
                    if let Some(extended) = &event.extended_message {
                        out.string("extended_message", extended);
                    }
                    out.string("message", &event.message);
                }
                PathFixture::Raw(kind) => {
                    out.string("kind", kind);
                }
            }
            out.end("dict");
        }
        out.end("array");
        out.string("description", &self.description);
        out.string("category", &self.category);
        out.string("type", &self.description);
        if let Some(check_name) = &self.check_name {
            out.string("check_name", check_name);
        }
        out.key("location");
        out.location(self.location);
        out.end("dict");
    }
}

/// Builder for one analysis report in the analyzer's plist format
#[derive(Debug, Clone)]
pub struct ReportFixture {
    files: Vec<String>,
    analyzer: Option<String>,
    diagnostics: Vec<DiagnosticFixture>,
}

impl ReportFixture {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            analyzer: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn analyzer(mut self, name: &str) -> Self {
        self.analyzer = Some(name.to_string());
        self
    }

    pub fn diagnostic(mut self, diagnostic: DiagnosticFixture) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn to_xml(&self) -> String {
        let mut out = PlistWriter::new();
        out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));
        out.event(Event::Start(
            BytesStart::new("plist").with_attributes([("version", "1.0")]),
        ));
        out.start("dict");

        out.key("diagnostics");
        out.start("array");
        for diagnostic in &self.diagnostics {
            diagnostic.write(&mut out);
        }
        out.end("array");

        out.key("files");
        out.start("array");
        for file in &self.files {
            out.text_element("string", file);
        }
        out.end("array");

        if let Some(analyzer) = &self.analyzer {
            out.key("metadata");
            out.start("dict");
            out.key("analyzer");
            out.start("dict");
            out.string("name", analyzer);
            out.end("dict");
            out.end("dict");
        }

        out.end("dict");
        out.end("plist");
        out.finish()
    }
}
