//! Formula compiler and evaluator.
//!
//! Formulas are prefix function calls over literals and `$column`
//! references, for example:
//!
//! - `isGreater($age, 18)`
//! - `IF(isEqual(mod($id, 2), 0), "even", "odd")`
//! - `add($per, 5.0f)`
//!
//! Compilation runs in fixed stages: lex, grammar check, reference and type
//! resolution against a concrete source, reshape to postfix, constant fold.
//! The result is a [`Program`]: a flat token sequence a small stack machine
//! executes once per row. Programs are compiled once and reused for every
//! row they filter or fill, so all name and overload resolution cost is paid
//! up front.

use crate::error::Error;
use crate::events::DataSource;
use crate::functions::{find_function, NativeFn};
use crate::logging;
use crate::value::{DataType, Value};

// Token kinds. Literal kinds share their bit with the matching DataType so a
// literal's type is the kind itself.
const T_INT32: u16 = 0x0001;
const T_INT64: u16 = 0x0002;
const T_FLOAT32: u16 = 0x0004;
const T_FLOAT64: u16 = 0x0008;
const T_STRING: u16 = 0x0010;
const T_BOOLEAN: u16 = 0x0020;
const T_COLUMN: u16 = 0x0040;
const T_FUNCTION: u16 = 0x0080;
const T_COMMA: u16 = 0x0100;
const T_OPEN: u16 = 0x0200;
const T_CLOSE: u16 = 0x0400;
const T_INVALID: u16 = 0x0800;

const T_DATA: u16 = T_INT32 | T_INT64 | T_FLOAT32 | T_FLOAT64 | T_STRING | T_BOOLEAN;
const T_OPERAND: u16 = T_DATA | T_COLUMN;

#[derive(Debug, Clone)]
enum Payload {
    /// Not yet resolved (separators stay here until stripped).
    None,
    Literal(Value),
    Column { index: usize },
    Function { function: NativeFn, argc: usize },
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    kind: u16,
    /// For function tokens, index of the matching `)`; set by the grammar
    /// check and consumed by the postfix rotation.
    end: usize,
    payload: Payload,
}

impl Token {
    fn new(text: String) -> Self {
        let kind = classify(&text);
        Token { text, kind, end: 0, payload: Payload::None }
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// `-?\d+`
fn is_int32_text(text: &str) -> bool {
    is_digits(text.strip_prefix('-').unwrap_or(text))
}

/// `-?\d+[lL]?`
fn is_int64_text(text: &str) -> bool {
    is_int32_text(text.strip_suffix(['l', 'L']).unwrap_or(text))
}

/// `-?\d+\.\d*` — the fraction part may be empty.
fn is_float_text(text: &str) -> bool {
    let t = text.strip_prefix('-').unwrap_or(text);
    match t.split_once('.') {
        Some((whole, frac)) => {
            is_digits(whole) && (frac.is_empty() || is_digits(frac))
        }
        None => false,
    }
}

fn is_word_tail(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// `\$[A-Za-z_]\w*`
fn is_column_text(text: &str) -> bool {
    let Some(t) = text.strip_prefix('$') else { return false };
    let mut chars = t.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && is_word_tail(chars.as_str())
}

/// `[A-Za-z]\w*`
fn is_function_text(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic()) && is_word_tail(chars.as_str())
}

/// Classifies a lexeme. First match wins, so a plain digit run is Int32 and
/// only an `l` suffix makes it Int64, mirroring the priority of the literal
/// grammar.
fn classify(text: &str) -> u16 {
    if is_int32_text(text) {
        T_INT32
    } else if is_int64_text(text) {
        T_INT64
    } else if text.ends_with('f') && is_float_text(&text[..text.len() - 1]) {
        T_FLOAT32
    } else if is_float_text(text) {
        T_FLOAT64
    } else if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        T_STRING
    } else if text == "True" || text == "False" {
        T_BOOLEAN
    } else if is_column_text(text) {
        T_COLUMN
    } else if is_function_text(text) {
        T_FUNCTION
    } else if text == "(" {
        T_OPEN
    } else if text == ")" {
        T_CLOSE
    } else if text == "," {
        T_COMMA
    } else {
        T_INVALID
    }
}

/// Single forward scan. Inside `"..."` every character belongs to the
/// string literal; outside, parens and commas self-delimit and whitespace
/// separates.
fn lex(formula: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_string = false;

    let mut push_current = |current: &mut String, tokens: &mut Vec<Token>| {
        if !current.is_empty() {
            tokens.push(Token::new(std::mem::take(current)));
        }
    };

    for c in formula.chars().chain(std::iter::once(' ')) {
        if in_string {
            current.push(c);
            if c == '"' {
                tokens.push(Token::new(std::mem::take(&mut current)));
                in_string = false;
            }
        } else if c == '"' {
            push_current(&mut current, &mut tokens);
            current.push('"');
            in_string = true;
        } else if c == ' ' || c == ',' {
            push_current(&mut current, &mut tokens);
            if c == ',' {
                tokens.push(Token::new(",".to_string()));
            }
        } else if c == '(' || c == ')' {
            push_current(&mut current, &mut tokens);
            tokens.push(Token::new(c.to_string()));
        } else {
            current.push(c);
        }
    }

    if in_string {
        logging::report("Parse", "Unterminated string.");
        return Err(Error::Parse("unterminated string".into()));
    }
    if let Some(bad) = tokens.iter().find(|t| t.kind == T_INVALID) {
        logging::report("Parse", format!("Invalid token '{}'.", bad.text));
        return Err(Error::Parse(format!("invalid token '{}'", bad.text)));
    }
    Ok(tokens)
}

/// Left-to-right scan over the allowed-next table. Also records, on every
/// function token, the index of its matching `)` for the postfix rotation.
fn check_grammar(tokens: &mut [Token]) -> Result<(), Error> {
    let size = tokens.len();

    if size == 0 {
        logging::report("Parse", "Empty expression.");
        return Err(Error::Parse("empty expression".into()));
    }
    if size == 1 {
        if tokens[0].kind & T_OPERAND != 0 {
            return Ok(());
        }
        logging::report(
            "Parse",
            format!("Expected literal value or column name but found '{}'.", tokens[0].text),
        );
        return Err(Error::Parse(format!("unexpected token '{}'", tokens[0].text)));
    }
    if tokens[0].kind & T_FUNCTION == 0 {
        logging::report("Parse", format!("Expected function name but found '{}'.", tokens[0].text));
        return Err(Error::Parse(format!("unexpected token '{}'", tokens[0].text)));
    }

    let mut depth: i32 = 0;
    let mut valid = true;
    let mut saw_open = false; // rejects sequences like A()B()
    let mut function_stack: Vec<usize> = Vec::new();
    let mut i = 0;

    while i < size && valid && !((saw_open && depth == 0) || depth < 0) {
        let next = tokens.get(i + 1).map_or(T_INVALID, |t| t.kind);
        match tokens[i].kind {
            k if k & T_OPERAND != 0 => valid = next & (T_COMMA | T_CLOSE) != 0,
            T_FUNCTION => {
                valid = next & T_OPEN != 0;
                function_stack.push(i);
            }
            T_COMMA => valid = next & (T_OPERAND | T_FUNCTION) != 0,
            T_OPEN => {
                valid = next & (T_OPERAND | T_FUNCTION | T_CLOSE) != 0;
                depth += 1;
                saw_open = true;
            }
            T_CLOSE => {
                valid = next & (T_COMMA | T_CLOSE | T_INVALID) != 0;
                depth -= 1;
                if let Some(f) = function_stack.pop() {
                    tokens[f].end = i;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if i != size || depth != 0 {
        let near = &tokens[i.saturating_sub(1).min(size - 1)].text;
        logging::report("Parse", format!("Invalid syntax near `{near}` token."));
        return Err(Error::Parse(format!("invalid syntax near `{near}`")));
    }
    Ok(())
}

/// Converts a literal token's text into its value.
fn to_literal(token: &mut Token) -> Result<(), Error> {
    let out_of_range = || Error::Parse(format!("literal `{}` out of range", token.text));
    let value = match token.kind {
        // i64 then narrow: a too-wide digit run truncates like the original
        T_INT32 => {
            Value::Int32(token.text.parse::<i64>().map_err(|_| out_of_range())? as i32)
        }
        T_INT64 => {
            let t = token.text.strip_suffix(['l', 'L']).unwrap_or(&token.text);
            Value::Int64(t.parse::<i64>().map_err(|_| out_of_range())?)
        }
        T_FLOAT32 => {
            let t = token.text.strip_suffix('f').unwrap_or(&token.text);
            Value::Float32(t.parse::<f32>().map_err(|_| out_of_range())?)
        }
        T_FLOAT64 => Value::Float64(token.text.parse::<f64>().map_err(|_| out_of_range())?),
        T_STRING => Value::Str(token.text[1..token.text.len() - 1].to_string()),
        T_BOOLEAN => Value::Bool(token.text == "True"),
        _ => return Ok(()),
    };
    token.payload = Payload::Literal(value);
    Ok(())
}

/// Resolves a `$column` token against the source.
fn resolve_column(token: &mut Token, source: &dyn DataSource) -> Result<DataType, Error> {
    let name = &token.text[1..];
    match source.find_column(name) {
        Some((index, data_type)) => {
            token.payload = Payload::Column { index };
            Ok(data_type)
        }
        None => {
            logging::report("Reference", format!("No such column `{name}`."));
            Err(Error::Reference(format!("no such column `{name}`")))
        }
    }
}

/// Renders `add_ii` back as `add(int32, int32)` for overload diagnostics.
fn pretty_overload(mangled: &str) -> String {
    let Some(split) = mangled.rfind('_') else { return mangled.to_string() };
    let (name, codes) = mangled.split_at(split);
    let args: Vec<&str> = codes[1..]
        .chars()
        .map(|c| DataType::from_type_char(c).map_or("undefined", |t| t.name()))
        .collect();
    format!("{name}({})", args.join(", "))
}

/// Resolves one function call in place: converts argument literals, resolves
/// column references, recurses into nested calls, builds the mangled lookup
/// name from the argument types, binds the registry entry, then rotates the
/// call's token range into postfix position. Returns the call's type.
fn resolve_function(
    tokens: &mut [Token],
    source: &dyn DataSource,
    f_pos: usize,
    f_end: usize,
) -> Result<DataType, Error> {
    tokens[f_pos].text.push('_');
    let mut i = f_pos + 2;
    while i < f_end {
        let kind = tokens[i].kind;
        if kind & T_DATA != 0 {
            to_literal(&mut tokens[i])?;
            let c = DataType::from_bits(kind).map(DataType::type_char).unwrap_or('u');
            tokens[f_pos].text.push(c);
        } else if kind & T_COLUMN != 0 {
            let data_type = resolve_column(&mut tokens[i], source)?;
            tokens[f_pos].text.push(data_type.type_char());
        } else if kind & T_FUNCTION != 0 {
            let child_end = tokens[i].end;
            let return_type = resolve_function(tokens, source, i, child_end)?;
            tokens[f_pos].text.push(return_type.type_char());
            i = child_end;
        }
        i += 1;
    }

    let Some(info) = find_function(&tokens[f_pos].text) else {
        logging::report(
            "Reference",
            format!("No matching function to call `{}`.", pretty_overload(&tokens[f_pos].text)),
        );
        return Err(Error::Reference(format!(
            "no matching overload `{}`",
            pretty_overload(&tokens[f_pos].text)
        )));
    };
    tokens[f_pos].payload = Payload::Function { function: info.function, argc: info.argc };

    // postfix reshape: the function token takes its `)`'s place
    tokens[f_pos..=f_end].rotate_left(1);
    Ok(info.return_type)
}

/// Type-checks the whole expression against the requested type and leaves
/// every token resolved.
fn check_reference(
    tokens: &mut Vec<Token>,
    source: &dyn DataSource,
    required: DataType,
) -> Result<(), Error> {
    if tokens.len() == 1 {
        let token = &mut tokens[0];
        let found = if token.kind & T_COLUMN != 0 {
            resolve_column(token, source)?
        } else {
            to_literal(token)?;
            DataType::from_bits(token.kind).unwrap_or(required)
        };
        if found != required {
            logging::report(
                "DataType",
                format!(
                    "Type mismatch, requested type is `{required}` but the formula has type `{found}`."
                ),
            );
            return Err(Error::mismatch(required, found));
        }
        return Ok(());
    }

    let last = tokens.len() - 1;
    let found = resolve_function(tokens, source, 0, last)?;
    if found != required {
        logging::report(
            "DataType",
            format!(
                "Type mismatch, requested type is `{required}` but the formula has type `{found}`."
            ),
        );
        return Err(Error::mismatch(required, found));
    }
    Ok(())
}

/// Drops commas and parens; what remains is the postfix program.
fn strip_separators(tokens: &mut Vec<Token>) {
    tokens.retain(|t| t.kind & (T_OPEN | T_CLOSE | T_COMMA | T_INVALID) == 0);
}

/// One pass over the postfix stream with an auxiliary stack. A function
/// whose arguments are all literals is applied now and replaced by its
/// result; everything else flows through untouched.
fn fold_constants(tokens: &mut Vec<Token>) -> Result<(), Error> {
    let mut stack: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens.drain(..) {
        let call = match &token.payload {
            Payload::Function { function, argc } => Some((*function, *argc)),
            _ => None,
        };
        if let Some((function, argc)) = call {
            let foldable = stack.len() >= argc
                && stack[stack.len() - argc..].iter().all(|t| t.kind & T_DATA != 0);
            if foldable {
                let at = stack.len() - argc;
                let args: Vec<Value> = stack
                    .drain(at..)
                    .map(|t| match t.payload {
                        Payload::Literal(v) => v,
                        _ => unreachable!("literal kind guarantees literal payload"),
                    })
                    .collect();
                let result = function(&args)?;
                stack.push(Token {
                    text: token.text,
                    kind: result.data_type().bits(),
                    end: 0,
                    payload: Payload::Literal(result),
                });
            } else {
                stack.push(token);
            }
        } else {
            stack.push(token);
        }
    }
    *tokens = stack;
    Ok(())
}

/// A compiled formula: a postfix token sequence plus the argument-buffer
/// size its executions reuse.
#[derive(Debug, Clone)]
pub struct Program {
    tokens: Vec<Token>,
    max_argc: usize,
    return_type: DataType,
}

impl Program {
    /// Compiles `formula` against `source` requiring the result type
    /// `required`. Every diagnostic also reaches the log sink.
    pub fn compile(
        formula: &str,
        source: &dyn DataSource,
        required: DataType,
    ) -> Result<Program, Error> {
        let mut tokens = lex(formula)?;
        check_grammar(&mut tokens)?;
        check_reference(&mut tokens, source, required)?;
        strip_separators(&mut tokens);
        fold_constants(&mut tokens)?;

        let max_argc = tokens
            .iter()
            .filter_map(|t| match t.payload {
                Payload::Function { argc, .. } => Some(argc),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        Ok(Program { tokens, max_argc, return_type: required })
    }

    /// Number of tokens left after folding. A fully constant expression
    /// compiles down to 1.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn return_type(&self) -> DataType {
        self.return_type
    }

    /// Whether any surviving token reads the given source column.
    pub fn references_column(&self, column_index: usize) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t.payload, Payload::Column { index } if index == column_index))
    }

    /// Runs the program for one row of `source`.
    pub fn evaluate(&self, source: &dyn DataSource, row_index: usize) -> Result<Value, Error> {
        let mut stack: Vec<Value> = Vec::with_capacity(self.tokens.len());
        let mut args = vec![Value::Int32(0); self.max_argc];
        self.run(source, row_index, &mut stack, &mut args)
    }

    fn run(
        &self,
        source: &dyn DataSource,
        row_index: usize,
        stack: &mut Vec<Value>,
        args: &mut [Value],
    ) -> Result<Value, Error> {
        for token in &self.tokens {
            match &token.payload {
                Payload::Literal(v) => stack.push(v.clone()),
                Payload::Column { index } => {
                    let value = source.value_at(row_index, *index).ok_or_else(|| {
                        Error::NotFound(format!(
                            "cell ({row_index}, {index}) not present in `{}`",
                            source.decorated_name()
                        ))
                    })?;
                    stack.push(value);
                }
                Payload::Function { function, argc } => {
                    if stack.len() < *argc {
                        return Err(Error::Unknown("corrupt formula program".into()));
                    }
                    let at = stack.len() - argc;
                    for (slot, value) in args[..*argc].iter_mut().zip(stack.drain(at..)) {
                        *slot = value;
                    }
                    stack.push(function(&args[..*argc])?);
                }
                Payload::None => {
                    return Err(Error::Unknown("corrupt formula program".into()));
                }
            }
        }
        stack.pop().ok_or_else(|| Error::Unknown("formula produced no value".into()))
    }

    /// Runs a boolean program for one row.
    pub fn matches(&self, source: &dyn DataSource, row_index: usize) -> Result<bool, Error> {
        self.evaluate(source, row_index)?.as_bool()
    }

    /// Collects the logical indices of every source row the program accepts.
    /// The evaluation stack and argument buffer are reused across rows.
    pub fn filter_rows(&self, source: &dyn DataSource) -> Result<Vec<usize>, Error> {
        let mut accepted = Vec::new();
        let mut stack: Vec<Value> = Vec::with_capacity(self.tokens.len());
        let mut args = vec![Value::Int32(0); self.max_argc];
        for row_index in 0..source.row_count() {
            if self.run(source, row_index, &mut stack, &mut args)?.as_bool()? {
                accepted.push(row_index);
            }
            stack.clear();
        }
        Ok(accepted)
    }
}
