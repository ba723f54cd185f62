//! Type string parser for Native column types.
//!
//! Parses a column type string such as `Map(String, Tuple(UInt8, UInt8))`
//! in two steps: a recursive-descent pass into a [`TypeExpr`] node, then a
//! dispatch on that node into a typed [`ColumnType`].

use crate::error::SchemaError;
use crate::schema::{decimal_precision_for_bits, ColumnType, TupleElement, MAX_DECIMAL_PRECISION};

/// Highest sub-second precision a `DateTime64` can carry (nanoseconds).
pub const MAX_DATETIME64_PRECISION: u32 = 9;

/// Syntactic form of a type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A bare name, e.g. `UInt8`.
    Primitive(String),
    /// A name with a parenthesized argument list, e.g. `Array(String)`.
    ///
    /// Arguments are kept as raw, trimmed strings; nested types are parsed
    /// on demand by the dispatcher.
    Parameterized { name: String, args: Vec<String> },
}

impl TypeExpr {
    /// The type family name.
    pub fn name(&self) -> &str {
        match self {
            TypeExpr::Primitive(name) => name,
            TypeExpr::Parameterized { name, .. } => name,
        }
    }
}

/// Parse a type string into its syntactic form.
///
/// # Example
/// ```
/// use chnative::schema::{parse_type_expr, TypeExpr};
///
/// let expr = parse_type_expr("Tuple(UInt8, Array(String))").unwrap();
/// assert_eq!(
///     expr,
///     TypeExpr::Parameterized {
///         name: "Tuple".to_string(),
///         args: vec!["UInt8".to_string(), "Array(String)".to_string()],
///     }
/// );
/// ```
pub fn parse_type_expr(input: &str) -> Result<TypeExpr, SchemaError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SchemaError::ParseError("Empty type string".to_string()));
    }

    let Some(open) = input.find('(') else {
        if input.contains(')') {
            return Err(SchemaError::ParseError(format!(
                "Unbalanced parentheses in '{}'",
                input
            )));
        }
        return Ok(TypeExpr::Primitive(input.to_string()));
    };

    let name = input[..open].trim();
    if name.is_empty() {
        return Err(SchemaError::ParseError(format!(
            "Missing type name in '{}'",
            input
        )));
    }
    if !input.ends_with(')') {
        return Err(SchemaError::ParseError(format!(
            "Expected ')' at end of '{}'",
            input
        )));
    }

    let inner = &input[open + 1..input.len() - 1];
    let args = split_type_args(inner).map_err(|e| match e {
        SchemaError::ParseError(_) => {
            SchemaError::ParseError(format!("Unbalanced parentheses in '{}'", input))
        }
        other => other,
    })?;

    Ok(TypeExpr::Parameterized {
        name: name.to_string(),
        args,
    })
}

/// Split a type argument list at top-level commas.
///
/// Commas nested inside parentheses or inside single-quoted literals do not
/// split. Each argument is trimmed; an empty or all-whitespace list yields
/// no arguments.
///
/// # Example
/// ```
/// use chnative::schema::split_type_args;
///
/// let args = split_type_args("String, Tuple(UInt8, UInt8)").unwrap();
/// assert_eq!(args, vec!["String", "Tuple(UInt8, UInt8)"]);
/// assert!(split_type_args("").unwrap().is_empty());
/// ```
pub fn split_type_args(input: &str) -> Result<Vec<String>, SchemaError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;
    let mut in_quote = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if in_quote {
            current.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                '\'' => in_quote = false,
                _ => {}
            }
            continue;
        }

        match c {
            '\'' => {
                in_quote = true;
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    SchemaError::ParseError(format!("Unbalanced parentheses in '{}'", input))
                })?;
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if depth != 0 || in_quote {
        return Err(SchemaError::ParseError(format!(
            "Unterminated argument list '{}'",
            input
        )));
    }

    args.push(current.trim().to_string());
    Ok(args)
}

/// Split an optional element name off a tuple argument.
///
/// Named tuples list their elements as `name Type`; the name is whatever
/// precedes the first top-level whitespace, provided that comes before any
/// parenthesis or quote.
pub fn split_element_name(arg: &str) -> (Option<&str>, &str) {
    let arg = arg.trim();
    let boundary = arg.find(|c: char| c.is_whitespace() || c == '(' || c == '\'');
    match boundary {
        Some(pos) if arg[pos..].starts_with(char::is_whitespace) => {
            let name = &arg[..pos];
            let rest = arg[pos..].trim_start();
            if rest.is_empty() {
                (None, arg)
            } else {
                (Some(name), rest)
            }
        }
        _ => (None, arg),
    }
}

/// Parse a type string into a typed column descriptor.
///
/// # Errors
/// - `SchemaError::UnsupportedType` for any type family that cannot be decoded
/// - `SchemaError::InvalidType` for a known family with bad arguments
/// - `SchemaError::ParseError` for malformed type strings
///
/// # Example
/// ```
/// use chnative::schema::{parse_column_type, ColumnType};
///
/// let ty = parse_column_type("Nullable(UInt8)").unwrap();
/// assert_eq!(ty, ColumnType::Nullable(Box::new(ColumnType::UInt8)));
/// assert!(parse_column_type("JSON").is_err());
/// ```
pub fn parse_column_type(input: &str) -> Result<ColumnType, SchemaError> {
    let expr = parse_type_expr(input)?;
    match expr {
        TypeExpr::Primitive(name) => parse_primitive(&name),
        TypeExpr::Parameterized { name, args } => parse_parameterized(input.trim(), &name, &args),
    }
}

fn parse_primitive(name: &str) -> Result<ColumnType, SchemaError> {
    let ty = match name {
        "UInt8" => ColumnType::UInt8,
        "UInt16" => ColumnType::UInt16,
        "UInt32" => ColumnType::UInt32,
        "UInt64" => ColumnType::UInt64,
        "UInt128" => ColumnType::UInt128,
        "UInt256" => ColumnType::UInt256,
        "Int8" => ColumnType::Int8,
        "Int16" => ColumnType::Int16,
        "Int32" => ColumnType::Int32,
        "Int64" => ColumnType::Int64,
        "Int128" => ColumnType::Int128,
        "Int256" => ColumnType::Int256,
        "Float32" => ColumnType::Float32,
        "Float64" => ColumnType::Float64,
        "Bool" => ColumnType::Bool,
        "String" => ColumnType::String,
        "Date" => ColumnType::Date,
        "Date32" => ColumnType::Date32,
        "DateTime" => ColumnType::DateTime { timezone: None },
        "UUID" => ColumnType::Uuid,
        "IPv4" => ColumnType::Ipv4,
        "IPv6" => ColumnType::Ipv6,
        "Nothing" => ColumnType::Nothing,
        other => return Err(SchemaError::UnsupportedType(other.to_string())),
    };
    Ok(ty)
}

fn parse_parameterized(
    full: &str,
    name: &str,
    args: &[String],
) -> Result<ColumnType, SchemaError> {
    match name {
        "FixedString" => {
            let [length] = expect_args::<1>(full, args)?;
            let length: usize = parse_number(full, length)?;
            if length == 0 {
                return Err(invalid(full, "length must be positive"));
            }
            Ok(ColumnType::FixedString(length))
        }
        "DateTime" => match args {
            [] => Ok(ColumnType::DateTime { timezone: None }),
            [tz] => Ok(ColumnType::DateTime {
                timezone: Some(unquote(tz).to_string()),
            }),
            _ => Err(invalid(full, "expected at most 1 argument")),
        },
        "DateTime64" => {
            let (precision, timezone) = match args {
                [p] => (p, None),
                [p, tz] => (p, Some(unquote(tz).to_string())),
                _ => return Err(invalid(full, "expected 1 or 2 arguments")),
            };
            let precision: u32 = parse_number(full, precision)?;
            if precision > MAX_DATETIME64_PRECISION {
                return Err(invalid(full, "precision must be between 0 and 9"));
            }
            Ok(ColumnType::DateTime64 {
                precision,
                timezone,
            })
        }
        "Decimal" => {
            let [precision, scale] = expect_args::<2>(full, args)?;
            decimal(full, parse_number(full, precision)?, parse_number(full, scale)?)
        }
        "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => {
            let [scale] = expect_args::<1>(full, args)?;
            let bits: u32 = name["Decimal".len()..]
                .parse()
                .map_err(|_| SchemaError::UnsupportedType(full.to_string()))?;
            decimal(
                full,
                decimal_precision_for_bits(bits),
                parse_number(full, scale)?,
            )
        }
        "Enum8" => Ok(ColumnType::Enum8(args.to_vec())),
        "Enum16" => Ok(ColumnType::Enum16(args.to_vec())),
        "Nullable" => {
            let [inner] = expect_args::<1>(full, args)?;
            Ok(ColumnType::Nullable(Box::new(parse_column_type(inner)?)))
        }
        "LowCardinality" => {
            let [inner] = expect_args::<1>(full, args)?;
            Ok(ColumnType::LowCardinality(Box::new(parse_column_type(
                inner,
            )?)))
        }
        "Array" => {
            let [inner] = expect_args::<1>(full, args)?;
            Ok(ColumnType::Array(Box::new(parse_column_type(inner)?)))
        }
        "Map" => {
            let [key, value] = expect_args::<2>(full, args)?;
            Ok(ColumnType::Map(
                Box::new(parse_column_type(key)?),
                Box::new(parse_column_type(value)?),
            ))
        }
        "Tuple" => {
            let elements = args
                .iter()
                .map(|arg| -> Result<TupleElement, SchemaError> {
                    let (name, ty) = split_element_name(arg);
                    Ok(TupleElement {
                        name: name.map(str::to_string),
                        ty: parse_column_type(ty)?,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            Ok(ColumnType::Tuple(elements))
        }
        other => {
            // A plain type with an argument list it does not take
            if parse_primitive(other).is_ok() {
                Err(invalid(full, "type takes no arguments"))
            } else {
                Err(SchemaError::UnsupportedType(full.to_string()))
            }
        }
    }
}

fn decimal(full: &str, precision: u32, scale: u32) -> Result<ColumnType, SchemaError> {
    if precision == 0 || precision > MAX_DECIMAL_PRECISION {
        return Err(invalid(full, "precision must be between 1 and 76"));
    }
    if scale > precision {
        return Err(invalid(full, "scale exceeds precision"));
    }
    Ok(ColumnType::Decimal { precision, scale })
}

fn expect_args<'a, const N: usize>(
    full: &str,
    args: &'a [String],
) -> Result<[&'a str; N], SchemaError> {
    if args.len() != N {
        return Err(invalid(
            full,
            &format!("expected {} argument(s), found {}", N, args.len()),
        ));
    }
    let mut out = [""; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.as_str();
    }
    Ok(out)
}

fn parse_number<T: std::str::FromStr>(full: &str, arg: &str) -> Result<T, SchemaError> {
    arg.trim()
        .parse()
        .map_err(|_| invalid(full, &format!("'{}' is not a valid number", arg)))
}

fn unquote(arg: &str) -> &str {
    let arg = arg.trim();
    arg.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(arg)
}

fn invalid(full: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidType(format!("{}: {}", full, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // TypeExpr tests
    // ========================================================================

    #[test]
    fn test_parse_primitive_expr() {
        assert_eq!(
            parse_type_expr("UInt8").unwrap(),
            TypeExpr::Primitive("UInt8".to_string())
        );
        assert_eq!(
            parse_type_expr("  String ").unwrap(),
            TypeExpr::Primitive("String".to_string())
        );
    }

    #[test]
    fn test_parse_parameterized_expr() {
        let expr = parse_type_expr("Map(String, Tuple(UInt8, UInt8))").unwrap();
        assert_eq!(expr.name(), "Map");
        assert_eq!(
            expr,
            TypeExpr::Parameterized {
                name: "Map".to_string(),
                args: vec!["String".to_string(), "Tuple(UInt8, UInt8)".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_expr_errors() {
        assert!(matches!(parse_type_expr(""), Err(SchemaError::ParseError(_))));
        assert!(matches!(
            parse_type_expr("Array(UInt8"),
            Err(SchemaError::ParseError(_))
        ));
        assert!(matches!(
            parse_type_expr("UInt8)"),
            Err(SchemaError::ParseError(_))
        ));
        assert!(matches!(
            parse_type_expr("(UInt8)"),
            Err(SchemaError::ParseError(_))
        ));
        assert!(matches!(
            parse_type_expr("Array(UInt8))(x)"),
            Err(SchemaError::ParseError(_))
        ));
    }

    // ========================================================================
    // split_type_args tests
    // ========================================================================

    #[test]
    fn test_split_respects_nesting() {
        let args = split_type_args("UInt8, Array(Tuple(String, UInt8)), Map(String, UInt64)").unwrap();
        assert_eq!(
            args,
            vec![
                "UInt8",
                "Array(Tuple(String, UInt8))",
                "Map(String, UInt64)"
            ]
        );
    }

    #[test]
    fn test_split_empty() {
        assert!(split_type_args("").unwrap().is_empty());
        assert!(split_type_args("   ").unwrap().is_empty());
    }

    #[test]
    fn test_split_respects_quotes() {
        let args = split_type_args("'a,b' = 1, 'c)' = 2, 'it\\'s' = 3").unwrap();
        assert_eq!(args, vec!["'a,b' = 1", "'c)' = 2", "'it\\'s' = 3"]);
    }

    #[test]
    fn test_split_unterminated() {
        assert!(split_type_args("Array(UInt8").is_err());
        assert!(split_type_args("'open").is_err());
    }

    #[test]
    fn test_split_element_name() {
        assert_eq!(split_element_name("a UInt8"), (Some("a"), "UInt8"));
        assert_eq!(
            split_element_name("tags Array(String)"),
            (Some("tags"), "Array(String)")
        );
        assert_eq!(split_element_name("UInt8"), (None, "UInt8"));
        assert_eq!(
            split_element_name("DateTime('Europe/Paris')"),
            (None, "DateTime('Europe/Paris')")
        );
    }

    // ========================================================================
    // Dispatcher tests
    // ========================================================================

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_column_type("UInt256").unwrap(), ColumnType::UInt256);
        assert_eq!(parse_column_type("Int128").unwrap(), ColumnType::Int128);
        assert_eq!(parse_column_type("Bool").unwrap(), ColumnType::Bool);
        assert_eq!(parse_column_type("IPv6").unwrap(), ColumnType::Ipv6);
        assert_eq!(
            parse_column_type("FixedString(16)").unwrap(),
            ColumnType::FixedString(16)
        );
    }

    #[test]
    fn test_parse_datetime_timezone_ignored_for_decoding() {
        assert_eq!(
            parse_column_type("DateTime('Asia/Tokyo')").unwrap(),
            ColumnType::DateTime {
                timezone: Some("Asia/Tokyo".to_string())
            }
        );
        assert_eq!(
            parse_column_type("DateTime64(3, 'UTC')").unwrap(),
            ColumnType::DateTime64 {
                precision: 3,
                timezone: Some("UTC".to_string())
            }
        );
        assert!(matches!(
            parse_column_type("DateTime64(10)"),
            Err(SchemaError::InvalidType(_))
        ));
    }

    #[test]
    fn test_parse_decimals() {
        assert_eq!(
            parse_column_type("Decimal(18, 6)").unwrap(),
            ColumnType::Decimal {
                precision: 18,
                scale: 6
            }
        );
        assert_eq!(
            parse_column_type("Decimal128(4)").unwrap(),
            ColumnType::Decimal {
                precision: 38,
                scale: 4
            }
        );
        assert!(matches!(
            parse_column_type("Decimal(4, 6)"),
            Err(SchemaError::InvalidType(_))
        ));
        assert!(matches!(
            parse_column_type("Decimal(77, 2)"),
            Err(SchemaError::InvalidType(_))
        ));
    }

    #[test]
    fn test_parse_enum_keeps_definition() {
        let ty = parse_column_type("Enum8('a' = 1, 'b, c' = 2)").unwrap();
        assert_eq!(
            ty,
            ColumnType::Enum8(vec!["'a' = 1".to_string(), "'b, c' = 2".to_string()])
        );
    }

    #[test]
    fn test_parse_named_tuple() {
        let ty = parse_column_type("Tuple(id UInt64, tags Array(String))").unwrap();
        let ColumnType::Tuple(elements) = ty else {
            panic!("expected tuple");
        };
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].name.as_deref(), Some("id"));
        assert_eq!(elements[0].ty, ColumnType::UInt64);
        assert_eq!(
            elements[1].ty,
            ColumnType::Array(Box::new(ColumnType::String))
        );
    }

    #[test]
    fn test_parse_empty_tuple() {
        assert_eq!(
            parse_column_type("Tuple()").unwrap(),
            ColumnType::Tuple(Vec::new())
        );
    }

    #[test]
    fn test_unsupported_names_offending_type() {
        let err = parse_column_type("JSON").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported column type: JSON");

        let err = parse_column_type("Array(Object('json'))").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported column type: Object('json')");
    }

    #[test]
    fn test_wrong_arity() {
        assert!(matches!(
            parse_column_type("Map(String)"),
            Err(SchemaError::InvalidType(_))
        ));
        assert!(matches!(
            parse_column_type("Array()"),
            Err(SchemaError::InvalidType(_))
        ));
        assert!(matches!(
            parse_column_type("UInt8(3)"),
            Err(SchemaError::InvalidType(_))
        ));
        assert!(matches!(
            parse_column_type("FixedString(x)"),
            Err(SchemaError::InvalidType(_))
        ));
    }
}
