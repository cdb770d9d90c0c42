//! A recursive-descent parser over the token stream from [`Lexer`].
//!
//! Binary operators are folded with an explicit operand/operator stack by
//! precedence (all left-associative). Union, unary minus, paths, steps and
//! primaries each get their own method.
use crate::ast::{BinaryOperator, Expression, KindTest, NameTest, NamespaceMatch, NodeTest, Predicates, Step};
use crate::axes::Axis;
use crate::error::XPathError;
use crate::functions::FunctionRegistry;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::namespace::NamespaceResolver;
use log::debug;

/// Compiles `source` into an expression tree, resolving prefixes through `resolver`.
pub fn parse_expression(
    source: &str,
    resolver: &dyn NamespaceResolver,
) -> Result<Expression, XPathError> {
    let lexer = Lexer::tokenize(source);
    if lexer.is_empty() {
        return Err(XPathError::XPathParse(
            source.to_string(),
            "empty expression".to_string(),
        ));
    }
    let mut parser = Parser::new(lexer, resolver);
    let expr = parser
        .parse_expr()
        .and_then(|expr| match parser.lexer.peek(0) {
            Some(token) => Err(XPathError::parse(format!("Bad token: {}", token))),
            None => Ok(expr),
        })
        .map_err(|err| err.in_expression(source))?;
    debug!("compiled '{}' as {}", source, expr);
    Ok(expr)
}

pub struct Parser<'r> {
    lexer: Lexer,
    resolver: &'r dyn NamespaceResolver,
}

impl<'r> Parser<'r> {
    pub fn new(lexer: Lexer, resolver: &'r dyn NamespaceResolver) -> Self {
        Parser { lexer, resolver }
    }

    pub fn parse_expr(&mut self) -> Result<Expression, XPathError> {
        self.parse_binary_expr()
    }

    fn parse_binary_expr(&mut self) -> Result<Expression, XPathError> {
        let mut operands = vec![self.parse_unary_expr()?];
        let mut operators: Vec<BinaryOperator> = Vec::new();
        while let Some(op) = self.peek_binary_operator() {
            self.lexer.next();
            while operators
                .last()
                .is_some_and(|top| top.precedence() >= op.precedence())
            {
                Self::fold(&mut operands, &mut operators)?;
            }
            operators.push(op);
            operands.push(self.parse_unary_expr()?);
        }
        while !operators.is_empty() {
            Self::fold(&mut operands, &mut operators)?;
        }
        operands
            .pop()
            .ok_or_else(|| XPathError::parse("Missing expression"))
    }

    fn fold(
        operands: &mut Vec<Expression>,
        operators: &mut Vec<BinaryOperator>,
    ) -> Result<(), XPathError> {
        let underflow = || XPathError::parse("Operator is missing an operand");
        let op = operators.pop().ok_or_else(underflow)?;
        let right = operands.pop().ok_or_else(underflow)?;
        let left = operands.pop().ok_or_else(underflow)?;
        operands.push(Expression::binary(op, left, right));
        Ok(())
    }

    /// Called right after an operand, so `*` and the keywords are operators here.
    fn peek_binary_operator(&self) -> Option<BinaryOperator> {
        let token = self.lexer.peek(0)?;
        match token.kind {
            TokenKind::Operator | TokenKind::Name => BinaryOperator::from_token(&token.text),
            _ => None,
        }
    }

    fn parse_unary_expr(&mut self) -> Result<Expression, XPathError> {
        if self.lexer.peek_is("-") {
            self.lexer.next();
            self.check_not_empty("Missing operand after '-'")?;
            return Ok(Expression::negate(self.parse_unary_expr()?));
        }
        self.parse_union_expr()
    }

    fn parse_union_expr(&mut self) -> Result<Expression, XPathError> {
        let first = self.parse_path_expr()?;
        if !self.lexer.peek_is("|") {
            return Ok(first);
        }
        let mut paths = vec![first];
        while self.lexer.peek_is("|") {
            self.lexer.next();
            self.check_not_empty("Missing next union location path")?;
            paths.push(self.parse_path_expr()?);
        }
        Ok(Expression::union(paths))
    }

    fn parse_path_expr(&mut self) -> Result<Expression, XPathError> {
        let (start, mut steps) = if self.peek_is_path_operator() {
            let op = self.next_token()?;
            if op.is("/") && !self.starts_step() {
                return Ok(Expression::root());
            }
            let step = self.parse_step(op.is("//"))?;
            (Expression::root(), vec![step])
        } else if let Some(filter) = self.parse_filter_expr()? {
            if !self.peek_is_path_operator() {
                return Ok(filter);
            }
            (filter, Vec::new())
        } else {
            let step = self.parse_step(false)?;
            (Expression::context_node(), vec![step])
        };
        while self.peek_is_path_operator() {
            let op = self.next_token()?;
            steps.push(self.parse_step(op.is("//"))?);
        }
        Ok(Expression::path(start, steps))
    }

    /// Parses a primary expression and its predicates, or returns `None` if the
    /// next token starts a location step instead.
    fn parse_filter_expr(&mut self) -> Result<Option<Expression>, XPathError> {
        let Some(token) = self.lexer.peek(0).cloned() else {
            return Ok(None);
        };
        let primary = match token.kind {
            TokenKind::Variable => {
                return Err(XPathError::parse(format!(
                    "Variable reference not allowed: {}",
                    token
                )));
            }
            TokenKind::Literal => {
                self.lexer.next();
                Expression::literal(token.literal_value())
            }
            TokenKind::Number => {
                self.lexer.next();
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| XPathError::parse(format!("Bad number: {}", token)))?;
                Expression::number(value)
            }
            TokenKind::Punct if token.is("(") => {
                self.lexer.next();
                self.check_not_empty("Missing expression after '('")?;
                let expr = self.parse_expr()?;
                self.check_not_empty("Unclosed parenthesis")?;
                self.check_next_equals(")")?;
                expr
            }
            TokenKind::Name
                if token.text != "*"
                    && !KindTest::is_valid_type(&token.text)
                    && self.lexer.peek(1).is_some_and(|next| next.is("(")) =>
            {
                self.parse_function_call()?
            }
            _ => return Ok(None),
        };
        if !self.lexer.peek_is("[") {
            return Ok(Some(primary));
        }
        let predicates = self.parse_predicates()?;
        Ok(Some(Expression::filter(
            primary,
            Predicates::new(predicates, false),
        )))
    }

    fn parse_function_call(&mut self) -> Result<Expression, XPathError> {
        let name = self.next_token()?;
        let function = FunctionRegistry::global()
            .get(&name.text)
            .ok_or_else(|| XPathError::UnknownFunction(name.text.clone()))?;
        self.check_next_equals("(")?;
        let mut args = Vec::new();
        if !self.lexer.peek_is(")") {
            loop {
                self.check_not_empty("Missing function argument list")?;
                args.push(self.parse_expr()?);
                if !self.lexer.peek_is(",") {
                    break;
                }
                self.lexer.next();
            }
        }
        self.check_not_empty("Unclosed function argument list")?;
        self.check_next_equals(")")?;
        Expression::function_call(function, args)
    }

    fn parse_step(&mut self, descendants: bool) -> Result<Step, XPathError> {
        if self.lexer.peek_is(".") {
            self.lexer.next();
            return Ok(Step::new(Axis::SelfAxis, NodeTest::Kind(KindTest::Node), Vec::new(), descendants));
        }
        if self.lexer.peek_is("..") {
            self.lexer.next();
            return Ok(Step::new(Axis::Parent, NodeTest::Kind(KindTest::Node), Vec::new(), descendants));
        }

        let axis = if self.lexer.peek_is("@") {
            self.lexer.next();
            self.check_not_empty("Missing attribute name")?;
            Axis::Attribute
        } else if self.lexer.peek(1).is_some_and(|next| next.is("::")) {
            let name = self.next_token()?;
            if name.kind != TokenKind::Name {
                return Err(XPathError::parse(format!("Bad token: {}", name)));
            }
            let axis = Axis::from_name(&name.text).ok_or_else(|| XPathError::UnknownAxis(name.text.clone()))?;
            self.lexer.next();
            self.check_not_empty("Missing node name")?;
            axis
        } else {
            Axis::Child
        };

        self.check_not_empty("Missing node test")?;
        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step::new(axis, test, predicates, descendants))
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        let token = self.next_token()?;
        if token.kind != TokenKind::Name {
            return Err(XPathError::parse(format!("Bad token: {}", token)));
        }
        if !self.lexer.peek_is("(") {
            return self.parse_name_test(&token.text).map(NodeTest::Name);
        }
        if !KindTest::is_valid_type(&token.text) {
            return Err(XPathError::InvalidNodeType(token.text));
        }
        self.lexer.next();
        let target = match self.lexer.peek(0) {
            Some(next) if next.kind == TokenKind::Literal => {
                let target = next.literal_value().to_string();
                self.lexer.next();
                Some(target)
            }
            _ => None,
        };
        self.check_not_empty("Unclosed node type test")?;
        self.check_next_equals(")")?;
        KindTest::new(&token.text, target).map(NodeTest::Kind)
    }

    fn parse_name_test(&self, name: &str) -> Result<NameTest, XPathError> {
        let Some((prefix, local)) = name.split_once(':') else {
            return Ok(NameTest::new(name));
        };
        let namespace = if prefix == "*" {
            NamespaceMatch::Any
        } else {
            let uri = self
                .resolver
                .lookup_namespace_uri(prefix)
                .filter(|uri| !uri.is_empty())
                .ok_or_else(|| XPathError::UnresolvedNamespacePrefix(prefix.to_string()))?;
            NamespaceMatch::Uri(uri)
        };
        Ok(NameTest::with_namespace(prefix, local, namespace))
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expression>, XPathError> {
        let mut predicates = Vec::new();
        while self.lexer.peek_is("[") {
            self.lexer.next();
            self.check_not_empty("Missing predicate expression")?;
            predicates.push(self.parse_expr()?);
            self.check_not_empty("Unclosed predicate expression")?;
            self.check_next_equals("]")?;
        }
        Ok(predicates)
    }

    fn peek_is_path_operator(&self) -> bool {
        self.lexer.peek_is("/") || self.lexer.peek_is("//")
    }

    /// Whether the next token can begin a location step.
    fn starts_step(&self) -> bool {
        self.lexer.peek(0).is_some_and(|token| {
            token.kind == TokenKind::Name || token.is(".") || token.is("..") || token.is("@")
        })
    }

    fn next_token(&mut self) -> Result<Token, XPathError> {
        self.lexer
            .next()
            .ok_or_else(|| XPathError::parse("Unexpected end of expression"))
    }

    fn check_not_empty(&self, message: &str) -> Result<(), XPathError> {
        if self.lexer.is_empty() {
            return Err(XPathError::parse(message));
        }
        Ok(())
    }

    fn check_next_equals(&mut self, expected: &str) -> Result<(), XPathError> {
        let token = self.next_token()?;
        if !token.is(expected) {
            return Err(XPathError::parse(format!(
                "Bad token, expected: {} got: {}",
                expected, token
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;
    use crate::namespace::NullResolver;

    fn parse(source: &str) -> Result<Expression, XPathError> {
        parse_expression(source, &NullResolver)
    }

    fn shape(source: &str) -> String {
        parse(source).unwrap().to_string()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(shape("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(shape("10 - 2 - 3"), "((10 - 2) - 3)");
        assert_eq!(shape("1 = 1 or 2 < 3 and 4"), "((1 = 1) or ((2 < 3) and 4))");
        assert_eq!(shape("-2 * 3"), "(-2 * 3)");
    }

    #[test]
    fn keywords_are_names_in_step_position() {
        assert_eq!(shape("div div div"), "(child::div div child::div)");
        assert_eq!(shape("and/or"), "child::and/child::or");
        assert_eq!(shape("* * *"), "(child::* * child::*)");
    }

    #[test]
    fn abbreviations_expand() {
        assert_eq!(shape("//a"), "/descendant-or-self::node()/child::a");
        assert_eq!(shape("../@id"), "parent::node()/attribute::id");
        assert_eq!(shape("a//."), "child::a/descendant-or-self::node()/self::node()");
        assert_eq!(shape("/"), "/");
        assert_eq!(shape("/ | /a"), "/ | /child::a");
    }

    #[test]
    fn filters_and_functions() {
        assert_eq!(shape("(//a)[2]/b"), "(/descendant-or-self::node()/child::a)[2]/child::b");
        assert_eq!(shape("(a | b)/c"), "(child::a | child::b)/child::c");
        assert_eq!(shape("(-1)[1]"), "(-1)[1]");
        assert_eq!(shape("id('x')[1]/a"), "id(\"x\")[1]/child::a");
        assert_eq!(shape("concat('a', \"b\")"), "concat(\"a\", \"b\")");
        assert_eq!(shape("processing-instruction('x')"), "child::processing-instruction('x')");
        assert!(matches!(
            parse("id('x')/a").unwrap().kind(),
            ExprKind::Path { .. }
        ));
    }

    #[test]
    fn variables_are_rejected() {
        let err = parse("$x").unwrap_err();
        assert!(matches!(err, XPathError::XPathParse(_, ref message) if message.contains("Variable reference not allowed")));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(parse(""), Err(XPathError::XPathParse(..))));
        assert!(matches!(parse("   "), Err(XPathError::XPathParse(..))));
        assert!(matches!(parse("//div["), Err(XPathError::XPathParse(..))));
        assert!(matches!(parse("//div[1"), Err(XPathError::XPathParse(..))));
        assert!(matches!(parse("(1"), Err(XPathError::XPathParse(..))));
        assert!(matches!(parse("concat('a',)"), Err(XPathError::XPathParse(..))));
        assert!(matches!(parse("1 +"), Err(XPathError::XPathParse(..))));
        assert!(matches!(parse("a b"), Err(XPathError::XPathParse(..))));
        assert!(matches!(parse("@"), Err(XPathError::XPathParse(..))));
    }

    #[test]
    fn semantic_errors() {
        assert_eq!(parse("nosuch()"), Err(XPathError::UnknownFunction("nosuch".into())));
        assert_eq!(parse("sideways::a"), Err(XPathError::UnknownAxis("sideways".into())));
        assert_eq!(parse("a/element()"), Err(XPathError::InvalidNodeType("element".into())));
        assert_eq!(
            parse("svg:rect"),
            Err(XPathError::UnresolvedNamespacePrefix("svg".into()))
        );
    }

    #[test]
    fn prefixes_resolve_through_resolver() {
        let resolver = |prefix: &str| (prefix == "svg").then(|| "http://www.w3.org/2000/svg".to_string());
        let expr = parse_expression("//svg:rect | //*:circle", &resolver).unwrap();
        assert_eq!(
            expr.to_string(),
            "/descendant-or-self::node()/child::svg:rect | /descendant-or-self::node()/child::*:circle"
        );
    }

    #[test]
    fn static_flags() {
        assert!(parse("position() = 2").unwrap().needs_context_position());
        assert!(!parse("//a[position() = 2]").unwrap().needs_context_position());
        assert!(parse("a").unwrap().needs_context_node());
        assert!(!parse("'a' = 'b'").unwrap().needs_context_node());
        assert!(parse("/a").unwrap().needs_context_node());
    }
}
