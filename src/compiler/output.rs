use crate::symbols::Section;

const INDENT: &str = "    ";

/// Where emitted lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Section(Section),
    Functions,
}

/// Bucket and indentation in force before `enter`, handed back to `leave`.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct Saved {
    bucket: Bucket,
    depth: usize,
}

/// Generated Python lines, one list per section plus one for functions.
///
/// Section lines are stored relative to the method body and function lines
/// relative to the class body; the assembler adds the enclosing indentation.
#[derive(Debug)]
pub struct Output {
    sections: [Vec<String>; 5],
    functions: Vec<String>,
    bucket: Bucket,
    depth: usize,
}

impl Output {
    pub fn new() -> Self {
        Self {
            sections: Default::default(),
            functions: Vec::new(),
            bucket: Bucket::Section(Section::MainLoop),
            depth: 0,
        }
    }

    /// Switch to `bucket` at its outermost level.
    pub fn enter(&mut self, bucket: Bucket) -> Saved {
        let saved = Saved {
            bucket: self.bucket,
            depth: self.depth,
        };
        self.bucket = bucket;
        self.depth = 0;
        saved
    }

    pub fn leave(&mut self, saved: Saved) {
        self.bucket = saved.bucket;
        self.depth = saved.depth;
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn lines_mut(&mut self) -> &mut Vec<String> {
        match self.bucket {
            Bucket::Section(section) => &mut self.sections[section as usize],
            Bucket::Functions => &mut self.functions,
        }
    }

    /// Append one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let line = format!("{}{}", INDENT.repeat(self.depth), text.as_ref());
        self.lines_mut().push(line);
    }

    /// Append `text` to the most recent line, if there is one.
    pub fn append(&mut self, text: &str) -> bool {
        match self.lines_mut().last_mut() {
            Some(last) => {
                last.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Position for a later `insert`.
    pub fn mark(&mut self) -> usize {
        self.lines_mut().len()
    }

    /// Insert a line at `mark`, indented at the current level.
    pub fn insert(&mut self, mark: usize, text: impl AsRef<str>) {
        let line = format!("{}{}", INDENT.repeat(self.depth), text.as_ref());
        self.lines_mut().insert(mark, line);
    }

    /// Remove and return the lines after `mark`, as stored.
    pub fn take_since(&mut self, mark: usize) -> Vec<String> {
        let lines = self.lines_mut();
        let mark = mark.min(lines.len());
        lines.split_off(mark)
    }

    /// Append lines returned by `take_since`, `extra` levels deeper.
    pub fn append_lines(&mut self, lines: Vec<String>, extra: usize) {
        let prefix = INDENT.repeat(extra);
        let target = self.lines_mut();
        target.extend(lines.into_iter().map(|line| format!("{}{}", prefix, line)));
    }

    /// Insert lines returned by `take_since` at `mark`, `extra` levels deeper.
    pub fn insert_lines(&mut self, mark: usize, lines: Vec<String>, extra: usize) {
        let prefix = INDENT.repeat(extra);
        let target = self.lines_mut();
        let mark = mark.min(target.len());
        target.splice(mark..mark, lines.into_iter().map(|line| format!("{}{}", prefix, line)));
    }

    /// Rewrite a previously emitted line in place.
    pub fn replace(&mut self, index: usize, from: &str, to: &str) {
        if let Some(line) = self.lines_mut().get_mut(index) {
            *line = line.replacen(from, to, 1);
        }
    }

    /// Lines after `mark` that are code rather than comments.
    pub fn statements_since(&mut self, mark: usize) -> usize {
        self.lines_mut()
            .iter()
            .skip(mark)
            .filter(|line| !line.trim_start().starts_with('#'))
            .count()
    }

    pub fn section(&self, section: Section) -> &[String] {
        &self.sections[section as usize]
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
