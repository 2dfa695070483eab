use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::{Aig, AigEdge, AigError, NodeId, Result, aig::error::ParserError};

fn invalid(line: usize, msg: impl Into<String>) -> ParserError {
    ParserError::InvalidToken {
        line,
        msg: msg.into(),
    }
}

fn read_u64(s: &str, line: usize) -> std::result::Result<u64, ParserError> {
    s.parse::<u64>()
        .map_err(|_| invalid(line, format!("{} expected u64", s)))
}

fn check_even(x: u64, line: usize) -> std::result::Result<(), ParserError> {
    if x & 1 == 1 {
        return Err(invalid(
            line,
            format!("expected literal to be even, got {}", x),
        ));
    }
    Ok(())
}

/// Largest variable index: literals `2 * M + 1` must fit in 32 bits.
const MAX_VAR: u64 = (u32::MAX >> 1) as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    m: u64,
    i: u64,
    o: u64,
    a: u64,
}

impl TryFrom<&str> for Header {
    type Error = ParserError;

    fn try_from(line: &str) -> std::result::Result<Self, Self::Error> {
        let tokens = line.split_whitespace().collect::<Vec<&str>>();

        match tokens.first() {
            Some(&"aag") => (),
            Some(&"aig") => {
                return Err(ParserError::UnsupportedFeature(
                    "binary AIGER, only the ASCII format is supported".to_string(),
                ));
            }
            _ => return Err(invalid(1, "expected aag")),
        }
        if tokens.len() < 6 {
            return Err(invalid(1, "missing header tokens"));
        }
        if tokens.len() > 6 {
            return Err(ParserError::UnsupportedFeature(
                "header only supports M I L O A".to_string(),
            ));
        }

        let m = read_u64(tokens[1], 1)?;
        let i = read_u64(tokens[2], 1)?;
        let l = read_u64(tokens[3], 1)?;
        let o = read_u64(tokens[4], 1)?;
        let a = read_u64(tokens[5], 1)?;

        if l != 0 {
            return Err(ParserError::UnsupportedFeature(
                "latches, only combinational circuits are supported".to_string(),
            ));
        }
        if m > MAX_VAR {
            return Err(invalid(
                1,
                format!("M={} exceeds the maximum variable index {}", m, MAX_VAR),
            ));
        }
        if i.checked_add(a).is_none_or(|n| m < n) {
            return Err(invalid(
                1,
                format!("M={} is too small for {} inputs and {} and gates", m, i, a),
            ));
        }

        Ok(Header { m, i, o, a })
    }
}

/// Numbered lines of the file, line 1 being the header.
struct Lines<R> {
    inner: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Lines {
            inner: reader.lines(),
            line: 0,
        }
    }

    fn next(&mut self) -> Result<Option<(usize, String)>> {
        match self.inner.next() {
            None => Ok(None),
            Some(l) => {
                let l = l.map_err(|e| ParserError::IoError(e.to_string()))?;
                self.line += 1;
                Ok(Some((self.line, l)))
            }
        }
    }

    fn expect(&mut self, what: &str) -> Result<(usize, String)> {
        self.next()?.ok_or_else(|| {
            invalid(
                self.line + 1,
                format!("unexpected end of file, expected {}", what),
            )
            .into()
        })
    }
}

fn read_literals<const N: usize>(
    text: &str,
    line: usize,
    m: u64,
    what: &str,
) -> std::result::Result<[u64; N], ParserError> {
    let tokens = text.split_whitespace().collect::<Vec<&str>>();
    if tokens.len() != N {
        return Err(invalid(
            line,
            format!("expected {} token(s) for {}, got {}", N, what, tokens.len()),
        ));
    }
    let mut literals = [0; N];
    for (lit, token) in literals.iter_mut().zip(tokens) {
        *lit = read_u64(token, line)?;
        if *lit >> 1 > m {
            return Err(invalid(
                line,
                format!("literal {} exceeds the maximum variable index {}", lit, m),
            ));
        }
    }
    Ok(literals)
}

/// A variable can only be defined once in a file, even with the exact same definition.
fn check_fresh(aig: &Aig, id: NodeId) -> Result<()> {
    match aig.get_node(id) {
        Some(node) if !node.is_undefined() => Err(AigError::DuplicateId(id)),
        _ => Ok(()),
    }
}

fn edge(literal: u64) -> AigEdge {
    AigEdge::new((literal >> 1) as NodeId, literal & 1 == 1)
}

/// `i<k> name` or `o<k> name`: the port kind, its position and its name.
fn read_symbol(text: &str, line: usize) -> std::result::Result<(char, usize, String), ParserError> {
    let (port, name) = text
        .split_once(' ')
        .ok_or_else(|| invalid(line, format!("expected a symbol, got {}", text)))?;
    let mut chars = port.chars();
    let kind = match chars.next() {
        Some(k @ ('i' | 'o')) => k,
        Some('l') => {
            return Err(ParserError::UnsupportedFeature(
                "latch symbols".to_string(),
            ));
        }
        _ => return Err(invalid(line, format!("expected a symbol, got {}", text))),
    };
    let pos = read_u64(chars.as_str(), line)? as usize;
    if name.is_empty() {
        return Err(invalid(line, "empty symbol name"));
    }
    Ok((kind, pos, name.to_string()))
}

impl Aig {
    /// Creates an AIG from an ASCII AIGER (`.aag`) source.
    ///
    /// Supports the combinational subset: `aag M I 0 O A`, inputs, outputs, and gates, symbols of
    /// inputs and outputs, and the comment section (everything after a `c` line).
    /// Variables which are used but never defined become [`AigNode::Undefined`] nodes.
    ///
    /// [`AigNode::Undefined`]: crate::AigNode::Undefined
    pub fn from_ascii(reader: impl BufRead) -> Result<Self> {
        let mut lines = Lines::new(reader);

        let (_, text) = lines.expect("header")?;
        let header = Header::try_from(text.as_str())?;
        let mut aig = Aig::with_max_var(header.m as usize);

        for _ in 0..header.i {
            let (line, text) = lines.expect("input")?;
            let [lit] = read_literals::<1>(&text, line, header.m, "input")?;
            check_even(lit, line)?;
            if lit == 0 {
                return Err(invalid(line, "the constant cannot be an input").into());
            }
            check_fresh(&aig, (lit >> 1) as NodeId)?;
            aig.add_input_at((lit >> 1) as NodeId, line)?;
        }

        // Outputs are numbered after every variable, they are added last.
        let mut outputs = Vec::new();
        for _ in 0..header.o {
            let (line, text) = lines.expect("output")?;
            let [lit] = read_literals::<1>(&text, line, header.m, "output")?;
            outputs.push((lit, line));
        }

        for _ in 0..header.a {
            let (line, text) = lines.expect("and gate")?;
            let [lhs, rhs0, rhs1] = read_literals::<3>(&text, line, header.m, "and gate")?;
            check_even(lhs, line)?;
            if lhs == 0 {
                return Err(invalid(line, "the constant cannot be an and gate").into());
            }
            check_fresh(&aig, (lhs >> 1) as NodeId)?;
            aig.add_and_at((lhs >> 1) as NodeId, edge(rhs0), edge(rhs1), line)?;
        }

        for (lit, line) in outputs {
            aig.add_output_at(edge(lit), line)?;
        }

        // Symbols, then comments
        while let Some((line, text)) = lines.next()? {
            if text.trim().is_empty() {
                continue;
            }
            if text.trim() == "c" {
                while let Some((_, comment)) = lines.next()? {
                    aig.add_comment(comment);
                }
                break;
            }
            let (kind, pos, name) = read_symbol(&text, line)?;
            let ports = if kind == 'i' {
                aig.get_inputs()
            } else {
                aig.get_outputs()
            };
            let id = *ports.get(pos).ok_or_else(|| {
                invalid(
                    line,
                    format!("symbol {}{} refers to a port which does not exist", kind, pos),
                )
            })?;
            aig.set_name(id, name)?;
        }

        aig.check_integrity()?;
        Ok(aig)
    }

    /// Creates an AIG from an `.aag` file (ASCII AIGER format).
    ///
    /// Warning, this uses a homemade "parser" which only supports combinational circuits.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("aag") => (),
            Some("aig") => {
                return Err(ParserError::UnsupportedFeature(
                    "binary AIGER, only the ASCII format is supported".to_string(),
                )
                .into());
            }
            _ => {
                return Err(
                    ParserError::IoError("invalid extension, expected .aag".to_string()).into(),
                );
            }
        }
        let f = File::open(path.as_ref()).map_err(|z| ParserError::IoError(z.to_string()))?;
        Aig::from_ascii(BufReader::new(f))
    }
}
