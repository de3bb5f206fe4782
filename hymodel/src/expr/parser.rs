use chumsky::{prelude::*, text::digits};

use crate::{
    expr::{
        BinaryOp, BitwiseOp, Expr, Literal, LogicalOp, ProductOp, RelationalOp, ShiftOp, SumOp,
        UnaryOp,
    },
    utils::{Error, ModelResult, ParserError},
};

type ParserExtra<'src> = extra::Err<Rich<'src, char>>;

pub fn identifier_parser<'src>() -> impl Parser<'src, &'src str, String, ParserExtra<'src>> + Clone
{
    text::ascii::ident()
        .map(|name: &str| name.to_string())
        .labelled("identifier")
}

pub fn number_parser<'src>() -> impl Parser<'src, &'src str, Literal, ParserExtra<'src>> + Clone {
    let fraction = just('.').then(digits(10)).labelled("fractional part");
    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(digits(10))
        .labelled("exponent part");

    digits(10)
        .then(fraction.or_not())
        .then(exponent.or_not())
        .to_slice()
        .map(|text: &str| {
            if text.contains(['.', 'e', 'E']) {
                Literal::Float(text.to_string())
            } else {
                Literal::Integer(text.to_string())
            }
        })
        .labelled("number")
}

pub fn string_parser<'src>() -> impl Parser<'src, &'src str, Literal, ParserExtra<'src>> + Clone {
    let escape = just('\\').ignore_then(choice((
        just('n').to('\n'),
        just('t').to('\t'),
        just('"'),
        just('\\'),
    )));

    none_of("\"\\")
        .or(escape)
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .map(Literal::String)
        .labelled("string")
}

/// Left associative binary level made of `operand (op operand)*`.
fn binary_level<'src>(
    operand: impl Parser<'src, &'src str, Expr, ParserExtra<'src>> + Clone + 'src,
    op: impl Parser<'src, &'src str, BinaryOp, ParserExtra<'src>> + Clone + 'src,
) -> Boxed<'src, 'src, &'src str, Expr, ParserExtra<'src>> {
    operand
        .clone()
        .foldl(op.padded().then(operand).repeated(), |lhs, (op, rhs)| {
            Expr::binary(op, lhs, rhs)
        })
        .boxed()
}

pub fn expression_parser<'src>() -> impl Parser<'src, &'src str, Expr, ParserExtra<'src>> + Clone {
    recursive(|expr| {
        let field = identifier_parser()
            .padded()
            .then_ignore(just('=').and_is(just("==").not()))
            .then(expr.clone());

        let fields = field
            .clone()
            .separated_by(just(',').padded())
            .at_least(1)
            .collect::<Vec<_>>();

        let union = fields
            .clone()
            .padded()
            .delimited_by(just("{|"), just("|}"))
            .map(Expr::Union)
            .labelled("union construct");

        let record = fields
            .padded()
            .delimited_by(just('{'), just('}'))
            .map(Expr::Record)
            .labelled("record construct");

        let array = expr
            .clone()
            .separated_by(just(',').padded())
            .collect::<Vec<_>>()
            .padded()
            .delimited_by(just('{'), just('}'))
            .map(Expr::Array)
            .labelled("array construct");

        let function_definition = identifier_parser()
            .filter(|name: &String| name == "function")
            .ignore_then(
                identifier_parser()
                    .padded()
                    .separated_by(just(','))
                    .collect::<Vec<_>>()
                    .delimited_by(just('('), just(')'))
                    .padded(),
            )
            .then(expr.clone())
            .map(|(parameters, body)| Expr::FunctionDefinition {
                parameters,
                body: Box::new(body),
            })
            .labelled("function definition");

        let name = identifier_parser().map(|name| match name.as_str() {
            "true" => Expr::Literal(Literal::Boolean(true)),
            "false" => Expr::Literal(Literal::Boolean(false)),
            _ => Expr::Identifier(name),
        });

        let atom = choice((
            function_definition,
            number_parser().map(Expr::Literal),
            string_parser().map(Expr::Literal),
            name,
            union,
            record,
            array,
            expr.clone()
                .padded()
                .delimited_by(just('('), just(')'))
                .labelled("parenthesized expression"),
        ))
        .padded();

        let arguments = expr
            .clone()
            .separated_by(just(',').padded())
            .collect::<Vec<_>>()
            .padded()
            .delimited_by(just('('), just(')'))
            .padded()
            .labelled("arguments");

        let application = atom
            .foldl(arguments.repeated(), |function, arguments| Expr::Apply {
                function: Box::new(function),
                arguments,
            })
            .boxed();

        // Right associative.
        let power = application
            .clone()
            .then_ignore(just('^').padded())
            .repeated()
            .foldr(application, |lhs, rhs| Expr::binary(BinaryOp::Power, lhs, rhs))
            .boxed();

        let unary = choice((
            just('-').to(UnaryOp::Neg),
            just('!').to(UnaryOp::Not),
            just('~').to(UnaryOp::BitNot),
        ))
        .padded()
        .repeated()
        .foldr(power, |op, operand| Expr::Unary {
            op,
            operand: Box::new(operand),
        })
        .boxed();

        let product = binary_level(
            unary,
            choice((
                just('*').to(BinaryOp::Product(ProductOp::Mul)),
                just('/').to(BinaryOp::Product(ProductOp::Div)),
                just('%').to(BinaryOp::Product(ProductOp::Rem)),
            )),
        );

        let sum = binary_level(
            product,
            choice((
                just('+').to(BinaryOp::Sum(SumOp::Add)),
                just('-').to(BinaryOp::Sum(SumOp::Sub)),
            )),
        );

        let shift = binary_level(
            sum,
            choice((
                just("<<").to(BinaryOp::Shift(ShiftOp::Left)),
                just(">>").to(BinaryOp::Shift(ShiftOp::Right)),
            )),
        );

        let relational = binary_level(
            shift,
            choice((
                just("==").to(RelationalOp::Equal),
                just("!=").to(RelationalOp::NotEqual),
                just(">=").to(RelationalOp::GreaterEqual),
                just("<=").to(RelationalOp::LessEqual),
                just('>').to(RelationalOp::Greater),
                just('<').to(RelationalOp::Less),
            ))
            .map(BinaryOp::Relational),
        );

        let bitwise_and = binary_level(
            relational,
            just('&')
                .and_is(just("&&").not())
                .to(BinaryOp::Bitwise(BitwiseOp::And)),
        );

        let bitwise_xor = binary_level(bitwise_and, just('#').to(BinaryOp::Bitwise(BitwiseOp::Xor)));

        let bitwise_or = binary_level(
            bitwise_xor,
            just('|')
                .and_is(just("||").not())
                .and_is(just("|}").not())
                .to(BinaryOp::Bitwise(BitwiseOp::Or)),
        );

        let logical_and =
            binary_level(bitwise_or, just("&&").to(BinaryOp::Logical(LogicalOp::And)));

        let logical_or =
            binary_level(logical_and, just("||").to(BinaryOp::Logical(LogicalOp::Or)));

        logical_or
            .then(
                just('?')
                    .padded()
                    .ignore_then(expr.clone())
                    .then_ignore(just(':').padded())
                    .then(expr)
                    .or_not(),
            )
            .map(|(condition, branches)| match branches {
                Some((then, otherwise)) => Expr::Conditional {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                },
                None => condition,
            })
            .labelled("expression")
    })
}

pub fn assignment_list_parser<'src>()
-> impl Parser<'src, &'src str, Vec<(String, Expr)>, ParserExtra<'src>> + Clone {
    identifier_parser()
        .padded()
        .then_ignore(just('=').and_is(just("==").not()))
        .then(expression_parser())
        .separated_by(just(';').padded())
        .allow_trailing()
        .collect::<Vec<_>>()
        .padded()
        .labelled("assignment list")
}

fn collect_errors(source: &str, errors: Vec<Rich<'_, char>>) -> Error {
    Error::ParserErrors {
        source_text: source.to_string(),
        errors: errors
            .into_iter()
            .map(|e| ParserError {
                message: e.to_string(),
                start: e.span().start,
                end: e.span().end,
                file: None,
            })
            .collect(),
    }
}

pub fn parse_expression(source: &str) -> ModelResult<Expr> {
    expression_parser()
        .padded()
        .then_ignore(end())
        .parse(source)
        .into_result()
        .map_err(|errors| collect_errors(source, errors))
}

pub fn parse_assignment_list(source: &str) -> ModelResult<Vec<(String, Expr)>> {
    assignment_list_parser()
        .then_ignore(end())
        .parse(source)
        .into_result()
        .map_err(|errors| collect_errors(source, errors))
}
