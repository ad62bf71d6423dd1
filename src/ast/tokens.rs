#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// ```
    Integer(i64),

    /// String literal enclosed in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'item #1'
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// Null value
    Null,

    // Identifiers
    /// Field name
    ///
    /// Must start with letter or underscore, followed by letters, digits,
    /// underscores or hyphens (`user-id`).
    Identifier(String),

    // Operators
    /// Equality operator
    EqEq,

    /// Inequality operator
    NotEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    /// Regex match operator
    ///
    /// # Examples
    /// ```text
    /// name =~ "^A"
    /// ```
    Match,

    // Logical
    /// Logical AND (word, not symbol)
    And,

    /// Logical OR (word, not symbol)
    Or,

    /// Cast keyword
    ///
    /// # Examples
    /// ```text
    /// price as decimal > 10
    /// ```
    As,

    // Delimiters
    /// Left bracket for index/key access
    LBracket,

    /// Right bracket
    RBracket,

    /// Left parenthesis for grouping or argument casts
    LParen,

    /// Right parenthesis
    RParen,

    /// Dot for field access
    Dot,

    /// End of input
    Eof,
}
