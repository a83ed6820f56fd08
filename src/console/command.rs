use nom::branch::alt;
use nom::bytes::complete::is_not;
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, not_line_ending, one_of};
use nom::combinator::{cut, eof, map, map_res, not, recognize};
use nom::error::context;
use nom::multi::{many0, many0_count, many1};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::{IResult, Parser};
use nom_supreme::error::ErrorTree;
use nom_supreme::final_parser::Location;
use nom_supreme::tag::complete::tag;
use std::num::ParseIntError;
use std::str::FromStr;

/// Breakpoint targets accepted by the `break` command.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakpointTarget {
    Address(usize),
    Line(String, u64),
    Function(String),
}

#[derive(Debug, PartialEq)]
pub enum RegisterCommand {
    Dump,
    Read(String),
    Write(String, u64),
}

#[derive(Debug, PartialEq)]
pub enum MemoryCommand {
    Read(usize),
    Write(usize, u64),
}

/// Commands the console accepts.
#[derive(Debug, PartialEq)]
pub enum Command {
    Continue,
    Break(BreakpointTarget),
    StepInto,
    StepOver,
    StepOut,
    StepInstruction,
    Status,
    Register(RegisterCommand),
    Memory(MemoryCommand),
    Variables,
    Backtrace,
    Symbol(String),
    Quit,
}

#[derive(thiserror::Error, Debug)]
#[error("malformed command: {0}")]
pub struct ParseError(String);

fn hexadecimal(input: &str) -> IResult<&str, &str, ErrorTree<&str>> {
    preceded(
        alt((tag("0x"), tag("0X"))),
        recognize(many1(terminated(
            one_of("0123456789abcdefABCDEF"),
            many0(char('_')),
        ))),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str, ErrorTree<&str>> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn command<'a, F>(
    ctx: &'static str,
    inner: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, Command, ErrorTree<&'a str>>
where
    F: Parser<&'a str, Command, ErrorTree<&'a str>>,
{
    context(
        ctx,
        delimited(
            many0(one_of(" \t\r\n")),
            inner,
            cut(preceded(many0(one_of(" \t\r\n")), eof)),
        ),
    )
}

impl Command {
    /// Parse an input line into a command.
    pub fn parse(input: &str) -> Result<Command, ParseError> {
        nom_supreme::final_parser::final_parser::<_, _, _, ErrorTree<Location>>(Self::parse_inner)(
            input,
        )
        .map_err(|e| ParseError(e.to_string()))
    }

    fn parse_inner(input: &str) -> IResult<&str, Command, ErrorTree<&str>> {
        macro_rules! verb {
            ($tag: expr, $command: expr) => {
                map(preceded(tag($tag), not(alphanumeric1)), |_| $command)
            };
        }

        macro_rules! verb2 {
            ($tag1: expr, $tag2: expr, $command: expr) => {
                map(
                    alt((
                        preceded(tag($tag1), not(alphanumeric1)),
                        preceded(tag($tag2), not(alphanumeric1)),
                    )),
                    |_| $command,
                )
            };
        }

        let continue_parser = verb2!("c", "continue", Command::Continue);
        let stepi_parser = verb!("stepi", Command::StepInstruction);
        let step_into_parser = verb!("step", Command::StepInto);
        let step_over_parser = verb!("next", Command::StepOver);
        let step_out_parser = verb!("finish", Command::StepOut);
        let status_parser = verb!("status", Command::Status);
        let variables_parser = verb2!("vars", "variables", Command::Variables);
        let backtrace_parser = verb2!("bt", "backtrace", Command::Backtrace);
        let quit_parser = verb2!("q", "quit", Command::Quit);

        fn symbol_parser(input: &str) -> IResult<&str, Command, ErrorTree<&str>> {
            map(
                preceded(tag("symbol"), preceded(multispace1, not_line_ending)),
                |name: &str| Command::Symbol(name.trim().to_string()),
            )(input)
        }

        fn break_parser(input: &str) -> IResult<&str, Command, ErrorTree<&str>> {
            preceded(
                alt((pair(tag("b"), multispace1), pair(tag("break"), multispace1))),
                cut(alt((
                    map_res(hexadecimal, |hex| -> Result<Command, ParseIntError> {
                        let addr = usize::from_str_radix(hex, 16)?;
                        Ok(Command::Break(BreakpointTarget::Address(addr)))
                    }),
                    map_res(
                        separated_pair(is_not(":"), tag(":"), digit1),
                        |(file, line): (&str, &str)| -> Result<Command, ParseIntError> {
                            Ok(Command::Break(BreakpointTarget::Line(
                                file.trim().to_string(),
                                u64::from_str(line.trim())?,
                            )))
                        },
                    ),
                    map(identifier, |fn_name: &str| {
                        Command::Break(BreakpointTarget::Function(fn_name.to_string()))
                    }),
                ))),
            )(input)
        }

        fn memory_parser(input: &str) -> IResult<&str, Command, ErrorTree<&str>> {
            preceded(
                alt((
                    pair(tag("mem"), multispace1),
                    pair(tag("memory"), multispace1),
                )),
                cut(alt((
                    map_res(
                        preceded(tag("read"), preceded(multispace1, hexadecimal)),
                        |hex| -> Result<Command, ParseIntError> {
                            let addr = usize::from_str_radix(hex, 16)?;
                            Ok(Command::Memory(MemoryCommand::Read(addr)))
                        },
                    ),
                    map_res(
                        preceded(
                            tag("write"),
                            preceded(
                                multispace1,
                                separated_pair(hexadecimal, multispace1, hexadecimal),
                            ),
                        ),
                        |(addr, value): (&str, &str)| -> Result<Command, ParseIntError> {
                            Ok(Command::Memory(MemoryCommand::Write(
                                usize::from_str_radix(addr, 16)?,
                                u64::from_str_radix(value, 16)?,
                            )))
                        },
                    ),
                ))),
            )(input)
        }

        fn register_parser(input: &str) -> IResult<&str, Command, ErrorTree<&str>> {
            preceded(
                alt((
                    pair(tag("reg"), multispace1),
                    pair(tag("register"), multispace1),
                )),
                cut(alt((
                    map(preceded(tag("dump"), not(alphanumeric1)), |_| {
                        Command::Register(RegisterCommand::Dump)
                    }),
                    map(
                        preceded(tag("read"), preceded(multispace1, identifier)),
                        |name: &str| Command::Register(RegisterCommand::Read(name.to_string())),
                    ),
                    map_res(
                        preceded(
                            tag("write"),
                            preceded(
                                multispace1,
                                separated_pair(identifier, multispace1, hexadecimal),
                            ),
                        ),
                        |(name, value): (&str, &str)| -> Result<Command, ParseIntError> {
                            Ok(Command::Register(RegisterCommand::Write(
                                name.to_string(),
                                u64::from_str_radix(value, 16)?,
                            )))
                        },
                    ),
                ))),
            )(input)
        }

        alt((
            command("continue", continue_parser),
            command("break", break_parser),
            command("stepi", stepi_parser),
            command("step", step_into_parser),
            command("next", step_over_parser),
            command("finish", step_out_parser),
            command("status", status_parser),
            command("register", register_parser),
            command("memory", memory_parser),
            command("variables", variables_parser),
            command("backtrace", backtrace_parser),
            command("symbol", symbol_parser),
            command("quit", quit_parser),
        ))(input)
    }
}
