//! ISO 10303-21 reader.
//!
//! Parses the physical file into an untyped entity graph and rebuilds faceted
//! B-rep shells from it. Only `FACETED_BREP` geometry is interpreted.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use kernel_api::FacetedShell;

use crate::errors::ExportError;

/// A single argument value in a STEP entity.
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    /// Entity reference (`#123`).
    EntityRef(u64),
    String(String),
    Real(f64),
    Integer(i64),
    /// Enumeration (`.T.` becomes `Enum("T")`).
    Enum(String),
    List(Vec<StepValue>),
    /// Derived value (`*`).
    Derived,
    /// Unset value (`$`).
    Null,
    /// Inline typed value such as `LENGTH_MEASURE(1.E-06)`.
    Typed {
        type_name: String,
        args: Vec<StepValue>,
    },
}

impl StepValue {
    pub fn as_entity_ref(&self) -> Option<u64> {
        match self {
            StepValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Real value; integers are widened.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            StepValue::Real(v) => Some(*v),
            StepValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            StepValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self {
            StepValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StepValue::Null)
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, StepValue::Derived)
    }
}

/// One entity instance.
///
/// Complex instances such as `(LENGTH_UNIT() NAMED_UNIT(*) ...)` have an
/// empty `type_name` and one [`StepValue::Typed`] argument per partial type.
#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    pub type_name: String,
    pub args: Vec<StepValue>,
    /// Source line of the instance.
    pub line: usize,
}

impl StepEntity {
    pub fn is_complex(&self) -> bool {
        self.type_name.is_empty()
    }

    /// Arguments of the partial type `name` of a complex instance.
    pub fn part(&self, name: &str) -> Option<&[StepValue]> {
        self.args.iter().find_map(|a| match a {
            StepValue::Typed { type_name, args } if type_name == name => Some(args.as_slice()),
            _ => None,
        })
    }

    fn arg(&self, index: usize) -> Result<&StepValue, ExportError> {
        self.args.get(index).ok_or_else(|| {
            ExportError::step(
                self.line,
                format!("#{} {} has no argument {index}", self.id, self.type_name),
            )
        })
    }

    fn ref_arg(&self, index: usize) -> Result<u64, ExportError> {
        self.arg(index)?.as_entity_ref().ok_or_else(|| {
            ExportError::step(
                self.line,
                format!("#{} argument {index} is not a reference", self.id),
            )
        })
    }

    fn list_arg(&self, index: usize) -> Result<&[StepValue], ExportError> {
        self.arg(index)?.as_list().ok_or_else(|| {
            ExportError::step(self.line, format!("#{} argument {index} is not a list", self.id))
        })
    }
}

/// Parsed content of a STEP file. Entities iterate in id order.
#[derive(Debug, Clone, Default)]
pub struct StepFile {
    pub header: Vec<StepEntity>,
    pub entities: BTreeMap<u64, StepEntity>,
}

impl StepFile {
    pub fn get(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Entity `id`, which must be of type `type_name`.
    pub fn require(&self, id: u64, type_name: &str) -> Result<&StepEntity, ExportError> {
        let entity = self
            .get(id)
            .ok_or_else(|| ExportError::step(0, format!("missing entity #{id}")))?;
        if entity.type_name != type_name {
            return Err(ExportError::step(
                entity.line,
                format!("#{id} is {}, expected {type_name}", entity.type_name),
            ));
        }
        Ok(entity)
    }

    pub fn entities_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a StepEntity> + 'a {
        self.entities.values().filter(move |e| e.type_name == type_name)
    }

    pub fn header_entity(&self, type_name: &str) -> Option<&StepEntity> {
        self.header.iter().find(|e| e.type_name == type_name)
    }
}

/// Parse a Part 21 file.
pub fn parse_step(input: &str) -> Result<StepFile, ExportError> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser { tokens, pos: 0 }.parse_file()
}

pub fn read_step_file(path: &Path) -> Result<StepFile, ExportError> {
    let text = fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;
    parse_step(&text)
}

/// Rebuild every `FACETED_BREP` in the file as a shell.
///
/// Face bounds flagged `.F.` are reversed so all loops are wound about the
/// outward normal.
pub fn faceted_shells(file: &StepFile) -> Result<Vec<FacetedShell>, ExportError> {
    file.entities_of_type("FACETED_BREP")
        .map(|brep| -> Result<FacetedShell, ExportError> {
            let closed = file.require(brep.ref_arg(1)?, "CLOSED_SHELL")?;
            let mut shell = FacetedShell::default();
            let mut point_index: BTreeMap<u64, u32> = BTreeMap::new();

            for face_ref in closed.list_arg(1)? {
                let face = file.require(as_ref(face_ref, closed)?, "FACE")?;
                for bound_ref in face.list_arg(1)? {
                    let bound_id = as_ref(bound_ref, face)?;
                    let bound = file.get(bound_id).ok_or_else(|| {
                        ExportError::step(face.line, format!("missing entity #{bound_id}"))
                    })?;
                    if bound.type_name != "FACE_OUTER_BOUND" && bound.type_name != "FACE_BOUND" {
                        return Err(ExportError::step(
                            bound.line,
                            format!("#{bound_id} is {}, expected a face bound", bound.type_name),
                        ));
                    }
                    let poly_loop = file.require(bound.ref_arg(1)?, "POLY_LOOP")?;
                    let forward = bound.arg(2)?.as_enum() != Some("F");

                    let mut polygon = Vec::new();
                    for point_ref in poly_loop.list_arg(1)? {
                        let point_id = as_ref(point_ref, poly_loop)?;
                        let index = match point_index.get(&point_id) {
                            Some(&i) => i,
                            None => {
                                let i = shell.points.len() as u32;
                                shell.points.push(cartesian_point(file, point_id)?);
                                point_index.insert(point_id, i);
                                i
                            }
                        };
                        polygon.push(index);
                    }
                    if !forward {
                        polygon.reverse();
                    }
                    shell.polygons.push(polygon);
                }
            }
            Ok(shell)
        })
        .collect()
}

/// Total signed volume of all faceted B-reps in the file.
pub fn faceted_volume(file: &StepFile) -> Result<f64, ExportError> {
    Ok(faceted_shells(file)?.iter().map(FacetedShell::volume).sum())
}

fn as_ref(value: &StepValue, owner: &StepEntity) -> Result<u64, ExportError> {
    value.as_entity_ref().ok_or_else(|| {
        ExportError::step(owner.line, format!("#{} lists a non-reference", owner.id))
    })
}

fn cartesian_point(file: &StepFile, id: u64) -> Result<[f64; 3], ExportError> {
    let point = file.require(id, "CARTESIAN_POINT")?;
    let coords = point.list_arg(1)?;
    let bad = || ExportError::step(point.line, format!("#{id} is not a 3D point"));
    if coords.len() != 3 {
        return Err(bad());
    }
    let mut out = [0.0; 3];
    for (slot, value) in out.iter_mut().zip(coords) {
        *slot = value.as_real().ok_or_else(bad)?;
    }
    Ok(out)
}

// ── Lexer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Keyword(String),
    EntityRef(u64),
    String(String),
    Real(f64),
    Integer(i64),
    Enum(String),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Equals,
    Asterisk,
    Dollar,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, ExportError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let Some(ch) = self.peek() else {
                return Ok(tokens);
            };
            let line = self.line;
            let token = match ch {
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b',' => self.single(Token::Comma),
                b';' => self.single(Token::Semicolon),
                b'=' => self.single(Token::Equals),
                b'*' => self.single(Token::Asterisk),
                b'$' => self.single(Token::Dollar),
                b'#' => self.entity_ref()?,
                b'\'' => self.string()?,
                b'.' => self.enumeration()?,
                b'-' | b'+' | b'0'..=b'9' => self.number()?,
                b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.keyword(),
                _ => {
                    return Err(ExportError::step(
                        line,
                        format!("unexpected character '{}'", ch as char),
                    ))
                }
            };
            tokens.push(Spanned { token, line });
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if self.peek() == Some(b'\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        let input = self.input;
        // Only ASCII bytes are accepted by the predicates used here.
        std::str::from_utf8(&input[start..self.pos]).unwrap_or_default()
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ExportError> {
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.bump();
            }
            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                let line = self.line;
                self.bump();
                self.bump();
                loop {
                    match (self.peek(), self.peek_at(1)) {
                        (Some(b'*'), Some(b'/')) => {
                            self.bump();
                            self.bump();
                            break;
                        }
                        (Some(_), _) => self.bump(),
                        (None, _) => return Err(ExportError::step(line, "unterminated comment")),
                    }
                }
                continue;
            }
            return Ok(());
        }
    }

    fn entity_ref(&mut self) -> Result<Token, ExportError> {
        let line = self.line;
        self.bump();
        let digits = self.take_while(|c| c.is_ascii_digit());
        digits
            .parse()
            .map(Token::EntityRef)
            .map_err(|_| ExportError::step(line, format!("invalid entity reference '#{digits}'")))
    }

    fn string(&mut self) -> Result<Token, ExportError> {
        let line = self.line;
        self.bump();
        let mut content = Vec::new();
        loop {
            match self.peek() {
                None => return Err(ExportError::step(line, "unterminated string")),
                Some(b'\'') if self.peek_at(1) == Some(b'\'') => {
                    content.push(b'\'');
                    self.bump();
                    self.bump();
                }
                Some(b'\'') => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    content.push(c);
                    self.bump();
                }
            }
        }
        Ok(Token::String(String::from_utf8_lossy(&content).into_owned()))
    }

    fn enumeration(&mut self) -> Result<Token, ExportError> {
        let line = self.line;
        self.bump();
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
        if name.is_empty() || self.peek() != Some(b'.') {
            return Err(ExportError::step(line, "malformed enumeration"));
        }
        self.bump();
        Ok(Token::Enum(name.to_string()))
    }

    /// Integers and reals. A `.` directly after the integer digits always
    /// belongs to the number, so `0.` and `1.E-06` are reals.
    fn number(&mut self) -> Result<Token, ExportError> {
        let line = self.line;
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.bump();
        }
        self.take_while(|c| c.is_ascii_digit());
        let mut is_real = false;
        if self.peek() == Some(b'.') {
            is_real = true;
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some(b'E' | b'e')) {
            is_real = true;
            self.bump();
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.bump();
            }
            self.take_while(|c| c.is_ascii_digit());
        }
        let input = self.input;
        let text = std::str::from_utf8(&input[start..self.pos]).unwrap_or_default();
        let invalid = || ExportError::step(line, format!("invalid number '{text}'"));
        if is_real {
            text.parse().map(Token::Real).map_err(|_| invalid())
        } else {
            text.parse().map(Token::Integer).map_err(|_| invalid())
        }
    }

    fn keyword(&mut self) -> Token {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-');
        Token::Keyword(name.to_string())
    }
}

// ── Parser ─────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn parse_file(mut self) -> Result<StepFile, ExportError> {
        let mut file = StepFile::default();

        self.expect_keyword("ISO-10303-21")?;
        self.expect(&Token::Semicolon)?;

        loop {
            if self.check_keyword("HEADER") {
                self.pos += 1;
                self.expect(&Token::Semicolon)?;
                file.header = self.header_section()?;
                self.end_section()?;
            } else if self.check_keyword("DATA") {
                self.pos += 1;
                self.expect(&Token::Semicolon)?;
                for entity in self.data_section()? {
                    if let Some(previous) = file.entities.get(&entity.id) {
                        return Err(ExportError::step(
                            entity.line,
                            format!("#{} already defined on line {}", entity.id, previous.line),
                        ));
                    }
                    file.entities.insert(entity.id, entity);
                }
                self.end_section()?;
            } else if self.check_keyword("END-ISO-10303-21") {
                self.pos += 1;
                self.expect(&Token::Semicolon)?;
                return Ok(file);
            } else {
                return Err(self.unexpected("a section"));
            }
        }
    }

    fn end_section(&mut self) -> Result<(), ExportError> {
        self.expect_keyword("ENDSEC")?;
        self.expect(&Token::Semicolon)
    }

    fn header_section(&mut self) -> Result<Vec<StepEntity>, ExportError> {
        let mut entities = Vec::new();
        while let Some(Spanned {
            token: Token::Keyword(name),
            line,
        }) = self.peek().cloned()
        {
            if name == "ENDSEC" {
                break;
            }
            self.pos += 1;
            let args = self.args()?;
            self.expect(&Token::Semicolon)?;
            entities.push(StepEntity {
                id: 0,
                type_name: name,
                args,
                line,
            });
        }
        Ok(entities)
    }

    fn data_section(&mut self) -> Result<Vec<StepEntity>, ExportError> {
        let mut entities = Vec::new();
        while let Some(Spanned {
            token: Token::EntityRef(id),
            line,
        }) = self.peek().cloned()
        {
            self.pos += 1;
            self.expect(&Token::Equals)?;

            let (type_name, args) = match self.peek().map(|t| t.token.clone()) {
                Some(Token::Keyword(name)) => {
                    self.pos += 1;
                    (name, self.args()?)
                }
                Some(Token::LParen) => (String::new(), self.complex_parts()?),
                _ => return Err(self.unexpected("an entity type")),
            };
            self.expect(&Token::Semicolon)?;
            entities.push(StepEntity {
                id,
                type_name,
                args,
                line,
            });
        }
        Ok(entities)
    }

    /// `(A(...) B(...) ...)` of a complex instance.
    fn complex_parts(&mut self) -> Result<Vec<StepValue>, ExportError> {
        self.expect(&Token::LParen)?;
        let mut parts = Vec::new();
        while let Some(Token::Keyword(name)) = self.peek().map(|t| t.token.clone()) {
            self.pos += 1;
            parts.push(StepValue::Typed {
                type_name: name,
                args: self.args()?,
            });
        }
        self.expect(&Token::RParen)?;
        if parts.is_empty() {
            return Err(self.unexpected("a partial entity type"));
        }
        Ok(parts)
    }

    fn args(&mut self) -> Result<Vec<StepValue>, ExportError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.value()?);
            while self.check(&Token::Comma) {
                self.pos += 1;
                args.push(self.value()?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn value(&mut self) -> Result<StepValue, ExportError> {
        let Some(token) = self.peek().map(|t| t.token.clone()) else {
            return Err(self.unexpected("a value"));
        };
        let value = match token {
            Token::EntityRef(id) => StepValue::EntityRef(id),
            Token::String(s) => StepValue::String(s),
            Token::Real(v) => StepValue::Real(v),
            Token::Integer(v) => StepValue::Integer(v),
            Token::Enum(s) => StepValue::Enum(s),
            Token::Asterisk => StepValue::Derived,
            Token::Dollar => StepValue::Null,
            Token::LParen => return self.args().map(StepValue::List),
            Token::Keyword(type_name) => {
                self.pos += 1;
                let args = self.args()?;
                return Ok(StepValue::Typed { type_name, args });
            }
            _ => return Err(self.unexpected("a value")),
        };
        self.pos += 1;
        Ok(value)
    }

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek().is_some_and(|t| &t.token == expected)
    }

    fn check_keyword(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Spanned { token: Token::Keyword(k), .. }) if k == name)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExportError> {
        if self.check(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("{expected:?}")))
        }
    }

    fn expect_keyword(&mut self, name: &str) -> Result<(), ExportError> {
        if self.check_keyword(name) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(name))
        }
    }

    fn unexpected(&self, wanted: &str) -> ExportError {
        let found = match self.peek() {
            Some(t) => format!("{:?}", t.token),
            None => "end of input".to_string(),
        };
        ExportError::step(self.line(), format!("expected {wanted}, found {found}"))
    }
}
