//! Section-based model-data (`.dat`) file parser
//!
//! Reads the AMPL-style data format into raw sets and parameter blocks.
//! Nothing here knows what a generator or node is; [`crate::model_data`]
//! maps the raw blocks onto the grid model.
//!
//! ```text
//! set nodes := NORTH LAKE ;          # set: name and members
//! param SimHours := 24;              # scalar
//! param: maxcap mincap :=            # table: header lists value columns
//! G1  150  20                        #   row: leading keys, then values
//! ;
//! param SimReserves:=                # one-column table
//! 1  12.5
//! ;
//! ```

use gridcommit_core::{GridError, GridResult};

/// `set NAME := a b c ;`
#[derive(Debug, Clone, PartialEq)]
pub struct SetDecl {
    pub name: String,
    pub items: Vec<String>,
    pub line: usize,
}

/// One data row: leading key tokens, then one token per column.
#[derive(Debug, Clone, PartialEq)]
pub struct DatRow {
    pub line: usize,
    pub keys: Vec<String>,
    pub values: Vec<String>,
}

impl DatRow {
    /// Value of column `idx` as a number.
    pub fn number(&self, idx: usize, column: &str) -> GridResult<f64> {
        let raw = self
            .values
            .get(idx)
            .ok_or_else(|| GridError::parse(self.line, format!("missing value for {}", column)))?;
        raw.parse::<f64>().map_err(|_| {
            GridError::parse(
                self.line,
                format!("{} value '{}' is not a number", column, raw),
            )
        })
    }
}

/// `param NAME := v;`, `param NAME := rows ;` or `param: c1 c2 := rows ;`
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBlock {
    pub columns: Vec<String>,
    pub rows: Vec<DatRow>,
    pub line: usize,
}

impl ParamBlock {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Scalar value of a single-column block holding one key-less row.
    pub fn scalar(&self) -> Option<&str> {
        match (self.columns.len(), self.rows.as_slice()) {
            (1, [row]) if row.keys.is_empty() => row.values.first().map(String::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatFile {
    pub sets: Vec<SetDecl>,
    pub params: Vec<ParamBlock>,
}

impl DatFile {
    pub fn set(&self, name: &str) -> Option<&SetDecl> {
        self.sets.iter().find(|s| s.name == name)
    }

    /// First block whose header contains `column`.
    pub fn block_with(&self, column: &str) -> Option<&ParamBlock> {
        self.params.iter().find(|p| p.column_index(column).is_some())
    }

    pub fn scalar(&self, name: &str) -> Option<(&str, usize)> {
        self.params
            .iter()
            .filter(|p| p.columns.len() == 1 && p.columns[0] == name)
            .find_map(|p| p.scalar().map(|v| (v, p.line)))
    }
}

enum State {
    Idle,
    Set(SetDecl),
    Header { line: usize, columns: Vec<String> },
    Body(ParamBlock),
}

/// Parse `.dat` content.
pub fn parse_dat(content: &str) -> GridResult<DatFile> {
    let mut file = DatFile::default();
    let mut state = State::Idle;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let tokens = tokenize(raw);
        let mut row: Vec<String> = Vec::new();

        for token in tokens {
            state = match state {
                State::Idle => match token.as_str() {
                    "set" => State::Set(SetDecl {
                        name: String::new(),
                        items: Vec::new(),
                        line: line_no,
                    }),
                    "param" | "param:" => State::Header {
                        line: line_no,
                        columns: Vec::new(),
                    },
                    other => {
                        return Err(GridError::parse(
                            line_no,
                            format!("expected 'set' or 'param', found '{}'", other),
                        ))
                    }
                },
                State::Set(mut decl) => match token.as_str() {
                    ":=" if decl.name.is_empty() => {
                        return Err(GridError::parse(line_no, "set without a name"))
                    }
                    ":=" => State::Set(decl),
                    ";" => {
                        file.sets.push(decl);
                        State::Idle
                    }
                    _ if decl.name.is_empty() => {
                        decl.name = token;
                        State::Set(decl)
                    }
                    _ => {
                        decl.items.push(token);
                        State::Set(decl)
                    }
                },
                State::Header { line, mut columns } => match token.as_str() {
                    ":" => State::Header { line, columns },
                    ":=" if columns.is_empty() => {
                        return Err(GridError::parse(line_no, "param block without columns"))
                    }
                    ":=" => State::Body(ParamBlock {
                        columns,
                        rows: Vec::new(),
                        line,
                    }),
                    ";" => return Err(GridError::parse(line_no, "param header without ':='")),
                    _ => {
                        columns.push(token);
                        State::Header { line, columns }
                    }
                },
                State::Body(mut block) => {
                    if token == ":=" {
                        return Err(GridError::parse(
                            line_no,
                            format!(
                                "unexpected ':=' inside param {}; missing ';'?",
                                block.columns.join(" ")
                            ),
                        ));
                    }
                    if token == ";" {
                        flush_row(&mut block, &mut row, line_no)?;
                        file.params.push(block);
                        State::Idle
                    } else {
                        row.push(token);
                        State::Body(block)
                    }
                }
            };
        }

        if let State::Body(block) = &mut state {
            flush_row(block, &mut row, line_no)?;
        }
    }

    match state {
        State::Idle => Ok(file),
        State::Set(decl) => Err(GridError::parse(
            decl.line,
            format!("set {} is not terminated by ';'", decl.name),
        )),
        State::Header { line, .. } => Err(GridError::parse(line, "unterminated param header")),
        State::Body(block) => Err(GridError::parse(
            block.line,
            format!("param {} is not terminated by ';'", block.columns.join(" ")),
        )),
    }
}

fn flush_row(block: &mut ParamBlock, row: &mut Vec<String>, line: usize) -> GridResult<()> {
    if row.is_empty() {
        return Ok(());
    }
    let width = block.columns.len();
    if row.len() < width {
        return Err(GridError::parse(
            line,
            format!(
                "row has {} fields but block {} needs at least {}",
                row.len(),
                block.columns.join(" "),
                width
            ),
        ));
    }
    let values = row.split_off(row.len() - width);
    block.rows.push(DatRow {
        line,
        keys: std::mem::take(row),
        values,
    });
    Ok(())
}

/// Split a line into tokens: `#` starts a comment, `:=` and `;` always stand alone.
fn tokenize(raw: &str) -> Vec<String> {
    let body = raw.split('#').next().unwrap_or("");
    body.replace(":=", " := ")
        .replace(';', " ; ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
