//! Inline XML output.
//!
//! Markables become nested elements, terminals become `<word .../>` leaves
//! and edges become attribute-only children. The element nesting comes from
//! [`Document::inline_events`].

use std::io::Write;
use std::ops::Range;

use super::WriteOptions;
use crate::document::{Document, InlineEvent};
use crate::edge::EdgeSchema;
use crate::encoding::Charset;
use crate::error::ExmlResult;
use crate::schema::WireAttrs;

fn open_tag<W: Write>(
    out: &mut W,
    name: &str,
    attrs: &[(String, String)],
    indent: usize,
    charset: Charset,
) -> ExmlResult<()> {
    write!(out, "{:indent$}<{}", "", name, indent = indent)?;
    for (key, value) in attrs {
        write!(out, " {}=\"{}\"", key, charset.escape_attr(value))?;
    }
    Ok(())
}

fn write_edges<W: Write>(
    out: &mut W,
    edges: &[(String, WireAttrs)],
    indent: usize,
    charset: Charset,
) -> ExmlResult<()> {
    for (name, attrs) in edges {
        open_tag(out, name, attrs, indent, charset)?;
        out.write_all(b"/>\n")?;
    }
    Ok(())
}

impl Document {
    /// Write the tokens in `range` and the markables starting there as
    /// inline XML body content.
    pub fn write_inline_xml<W: Write>(
        &mut self,
        out: &mut W,
        range: Range<usize>,
        options: &WriteOptions,
    ) -> ExmlResult<()> {
        let charset = options.charset;
        let events = self.inline_events(range, None, options.force_ids)?;
        let mut depth = 0usize;
        for event in events {
            match event {
                InlineEvent::Start { layer, attrs, edges } => {
                    open_tag(out, &layer, &attrs, depth, charset)?;
                    out.write_all(b">\n")?;
                    write_edges(out, &edges, depth + 1, charset)?;
                    depth += 1;
                }
                InlineEvent::Terminal(key) => {
                    let ser = self.terminal_schema().serialize(key, self, options.force_ids)?;
                    open_tag(out, &ser.layer, &ser.attrs, depth, charset)?;
                    if ser.edges.is_empty() {
                        out.write_all(b"/>\n")?;
                    } else {
                        out.write_all(b">\n")?;
                        write_edges(out, &ser.edges, depth + 1, charset)?;
                        writeln!(out, "{:indent$}</{}>", "", ser.layer, indent = depth)?;
                    }
                }
                InlineEvent::End { layer } => {
                    depth = depth.saturating_sub(1);
                    writeln!(out, "{:indent$}</{}>", "", layer, indent = depth)?;
                }
            }
        }
        Ok(())
    }

    /// Write the `<schema>` header.
    ///
    /// Edge types shared by several layers are declared once, with all
    /// parents joined by `|`; the first declaration provides the attributes.
    pub fn describe_schema<W: Write>(&self, out: &mut W, charset: Charset) -> ExmlResult<()> {
        let mut text = String::from("<schema>\n");
        let mut edges: Vec<(&EdgeSchema, Vec<String>)> = Vec::new();
        let all = std::iter::once(self.terminal_schema()).chain(self.layers().map(|(_, s)| s));
        for schema in all {
            schema.describe(&mut text, charset);
            for edge in schema.edges() {
                match edges.iter_mut().find(|(e, _)| e.name == edge.name) {
                    Some((_, parents)) => parents.push(schema.name.clone()),
                    None => edges.push((edge, vec![schema.name.clone()])),
                }
            }
        }
        for (edge, parents) in &edges {
            edge.describe(&mut text, parents, charset);
        }
        text.push_str("</schema>\n");
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Write the whole document: declaration, header and inline body.
    pub fn save<W: Write>(&mut self, out: &mut W, options: &WriteOptions) -> ExmlResult<()> {
        write_prologue(self, out, options.charset)?;
        self.write_inline_xml(out, 0..self.len(), options)?;
        write_epilogue(out)
    }
}

/// Declaration, `<exml-doc>`, schema and `<body>` opening.
pub(crate) fn write_prologue<W: Write>(
    doc: &Document,
    out: &mut W,
    charset: Charset,
) -> ExmlResult<()> {
    writeln!(out, "<?xml version=\"1.0\" encoding=\"{}\"?>", charset.xml_name())?;
    out.write_all(b"<exml-doc>\n")?;
    doc.describe_schema(out, charset)?;
    out.write_all(b"<body serialization=\"inline\">\n")?;
    Ok(())
}

pub(crate) fn write_epilogue<W: Write>(out: &mut W) -> ExmlResult<()> {
    out.write_all(b"</body>\n</exml-doc>\n")?;
    Ok(())
}
