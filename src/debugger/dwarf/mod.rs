pub mod eval;

use crate::debugger::address::GlobalAddress;
use crate::debugger::error::Error;
use fallible_iterator::FallibleIterator;
use gimli::{
    AttributeValue, Dwarf, Encoding, Expression, Range, Reader, RunTimeEndian, Unit,
    DW_AT_frame_base, DW_AT_location, DW_AT_name, DW_TAG_subprogram, DW_TAG_variable,
};
use itertools::Itertools;
use object::{Object, ObjectSection, ObjectSymbol, ObjectSymbolTable, SymbolKind};
use std::borrow::Cow;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::rc::Rc;

pub type EndianRcSlice = gimli::EndianRcSlice<RunTimeEndian>;

/// An ELF symbol relevant to the debugger.
#[derive(Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub address: u64,
}

/// Where a variable value lives according to its DW_AT_location.
pub enum VarLocation {
    Expr(Expression<EndianRcSlice>),
    Unsupported,
    Absent,
}

/// A variable debug entry owned by a function.
pub struct VariableDie {
    pub name: Option<String>,
    pub location: VarLocation,
}

/// A subprogram debug entry.
pub struct FunctionDie {
    pub name: Option<String>,
    pub ranges: Vec<Range>,
    pub frame_base: Option<Expression<EndianRcSlice>>,
    pub variables: Vec<VariableDie>,
    pub encoding: Encoding,
}

impl FunctionDie {
    /// Entry address of the function, the lowest of its pc ranges.
    pub fn low_pc(&self) -> Option<GlobalAddress> {
        self.ranges
            .iter()
            .map(|range| range.begin)
            .min()
            .map(GlobalAddress::from)
    }
}

#[derive(PartialEq, Debug)]
struct LineRow {
    address: u64,
    file_index: u64,
    line: u64,
    is_stmt: bool,
}

struct FunctionRange {
    range: Range,
    fn_idx: usize,
}

struct CompilationUnit {
    // root DW_AT_name, the compiled source path
    name: Option<String>,
    files: Vec<String>,
    ranges: Vec<Range>,
    lines: Vec<LineRow>,
    functions: Vec<FunctionDie>,
    fn_ranges: Vec<FunctionRange>,
}

/// One row of a unit line table resolved against its file table. Rows of a
/// unit form an ordered sequence restartable from any position.
pub struct Place<'a> {
    pub file: &'a str,
    pub address: GlobalAddress,
    pub line_number: u64,
    pub is_stmt: bool,
    pos_in_unit: usize,
    unit: &'a CompilationUnit,
}

impl<'a> Place<'a> {
    /// The subsequent row in the same line sequence.
    pub fn next(&self) -> Option<Place<'a>> {
        self.unit.place(self.pos_in_unit + 1)
    }
}

impl PartialEq for Place<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file
            && self.address == other.address
            && self.line_number == other.line_number
            && self.pos_in_unit == other.pos_in_unit
    }
}

impl CompilationUnit {
    fn place(&self, pos: usize) -> Option<Place> {
        let row = self.lines.get(pos)?;
        Some(Place {
            file: self
                .files
                .get(row.file_index as usize)
                .map(|file| file.as_str())
                .unwrap_or_default(),
            address: GlobalAddress::from(row.address),
            line_number: row.line,
            is_stmt: row.is_stmt,
            pos_in_unit: pos,
            unit: self,
        })
    }

    fn contains(&self, pc: GlobalAddress) -> bool {
        let pc = pc.as_u64();
        match self.ranges.binary_search_by_key(&pc, |range| range.begin) {
            Ok(_) => true,
            Err(pos) => self.ranges[..pos]
                .iter()
                .rev()
                .any(|range| range.begin <= pc && pc < range.end),
        }
    }

    fn find_place(&self, pc: GlobalAddress) -> Option<Place> {
        let pos = match self
            .lines
            .binary_search_by_key(&pc.as_u64(), |row| row.address)
        {
            Ok(pos) => pos,
            Err(0) => return None,
            Err(pos) => pos - 1,
        };
        self.place(pos)
    }
}

/// Queryable index over the debugee's ELF symbols and DWARF debug
/// information. Immutable after construction.
pub struct DebugInfo {
    _inner: Dwarf<EndianRcSlice>,
    units: Vec<CompilationUnit>,
    symbols: Vec<Symbol>,
}

impl DebugInfo {
    pub fn new<'data: 'file, 'file, OBJ: Object<'data, 'file>>(
        obj_file: &'data OBJ,
    ) -> Result<Self, Error> {
        let endian = if obj_file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        fn load_section<'data: 'file, 'file, OBJ, Endian>(
            id: gimli::SectionId,
            file: &'data OBJ,
            endian: Endian,
        ) -> Result<gimli::EndianRcSlice<Endian>, Error>
        where
            OBJ: Object<'data, 'file>,
            Endian: gimli::Endianity,
        {
            let data = file
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[]));
            Ok(gimli::EndianRcSlice::new(Rc::from(&*data), endian))
        }

        let dwarf = Dwarf::load(|id| load_section(id, obj_file, endian))?;

        Ok(Self {
            units: parse_units(&dwarf)?,
            symbols: parse_symbols(obj_file),
            _inner: dwarf,
        })
    }

    fn find_unit(&self, pc: GlobalAddress) -> Option<&CompilationUnit> {
        self.units.iter().find(|unit| unit.contains(pc))
    }

    /// The line row at or before `pc` in the compilation unit containing it.
    pub fn find_place_from_pc(&self, pc: GlobalAddress) -> Result<Place, Error> {
        let unit = self.find_unit(pc).ok_or(Error::UnitNotFound(pc))?;
        unit.find_place(pc).ok_or(Error::PlaceNotFound(pc))
    }

    /// The subprogram whose pc range contains `pc`.
    pub fn find_function_by_pc(&self, pc: GlobalAddress) -> Result<&FunctionDie, Error> {
        let unit = self.find_unit(pc).ok_or(Error::UnitNotFound(pc))?;

        let search_pos = match unit
            .fn_ranges
            .binary_search_by_key(&pc.as_u64(), |fr| fr.range.begin)
        {
            Ok(pos) => pos + 1,
            Err(pos) => pos,
        };

        unit.fn_ranges[..search_pos]
            .iter()
            .rev()
            .find(|fr| pc.as_u64() >= fr.range.begin && pc.as_u64() < fr.range.end)
            .map(|fr| &unit.functions[fr.fn_idx])
            .ok_or(Error::FunctionNotFound(pc))
    }

    /// The first subprogram carrying DW_AT_name equal to `name`.
    pub fn find_function_by_name(&self, name: &str) -> Result<&FunctionDie, Error> {
        self.units
            .iter()
            .flat_map(|unit| unit.functions.iter())
            .find(|func| func.name.as_deref() == Some(name))
            .ok_or_else(|| Error::FunctionNameNotFound(name.to_string()))
    }

    /// The first statement row with `line` in a unit whose source path ends
    /// with `file_suffix`.
    pub fn find_stmt_place(&self, file_suffix: &str, line: u64) -> Result<Place, Error> {
        for unit in &self.units {
            let matched = unit
                .name
                .as_ref()
                .map(|name| name.ends_with(file_suffix))
                .unwrap_or_default();
            if !matched {
                continue;
            }

            for (pos, row) in unit.lines.iter().enumerate() {
                if row.is_stmt && row.line == line {
                    return unit.place(pos).ok_or(Error::NoSuitablePlace);
                }
            }
        }
        Err(Error::NoSuitablePlace)
    }

    /// Exact-name matches over both the static and the dynamic symbol table.
    pub fn find_symbols<'a>(&'a self, name: &str) -> Vec<&'a Symbol> {
        self.symbols.iter().filter(|sym| sym.name == name).collect()
    }
}

fn parse_units(dwarf: &Dwarf<EndianRcSlice>) -> Result<Vec<CompilationUnit>, Error> {
    let units = dwarf
        .units()
        .map(|header| {
            let unit = dwarf.unit(header)?;
            parse_unit(dwarf, &unit)
        })
        .collect::<Vec<_>>()?;
    Ok(units)
}

fn parse_unit(
    dwarf: &Dwarf<EndianRcSlice>,
    unit: &Unit<EndianRcSlice>,
) -> gimli::Result<CompilationUnit> {
    let mut lines = vec![];
    let mut files = vec![];
    if let Some(ref line_program) = unit.line_program {
        let mut rows = line_program.clone().rows();
        while let Some((_, row)) = rows.next_row()? {
            lines.push(LineRow {
                address: row.address(),
                file_index: row.file_index(),
                line: row.line().map(NonZeroU64::get).unwrap_or(0),
                is_stmt: row.is_stmt(),
            });
        }
        files = parse_files(dwarf, unit, rows.header())?;
    }
    lines.sort_by_key(|row| row.address);

    let mut ranges = dwarf.unit_ranges(unit)?.collect::<Vec<_>>()?;
    ranges.sort_by_key(|range| range.begin);

    let mut functions: Vec<FunctionDie> = vec![];
    let mut fn_ranges = vec![];
    // depth of the subprogram subtree currently parsed, if any
    let mut subprogram_depth: Option<isize> = None;
    let mut depth = 0isize;

    let mut cursor = unit.entries();
    while let Some((delta_depth, die)) = cursor.next_dfs()? {
        depth += delta_depth;
        if matches!(subprogram_depth, Some(d) if depth <= d) {
            subprogram_depth = None;
        }

        match die.tag() {
            DW_TAG_subprogram => {
                let die_ranges = dwarf.die_ranges(unit, die)?.collect::<Vec<_>>()?;
                let func = FunctionDie {
                    name: parse_die_name(dwarf, unit, die)?,
                    frame_base: parse_expr_attr(die, DW_AT_frame_base)?,
                    variables: vec![],
                    ranges: die_ranges,
                    encoding: unit.encoding(),
                };
                for range in &func.ranges {
                    fn_ranges.push(FunctionRange {
                        range: *range,
                        fn_idx: functions.len(),
                    });
                }
                functions.push(func);
                subprogram_depth = Some(depth);
            }
            DW_TAG_variable => {
                if subprogram_depth.is_some() {
                    let location = match die.attr(DW_AT_location)? {
                        Some(attr) => match attr.value() {
                            AttributeValue::Exprloc(expr) => VarLocation::Expr(expr),
                            _ => VarLocation::Unsupported,
                        },
                        None => VarLocation::Absent,
                    };
                    let var = VariableDie {
                        name: parse_die_name(dwarf, unit, die)?,
                        location,
                    };
                    if let Some(func) = functions.last_mut() {
                        func.variables.push(var);
                    }
                }
            }
            _ => {}
        }
    }
    fn_ranges.sort_by_key(|fr| fr.range.begin);

    let name = match unit.name.as_ref() {
        Some(name) => Some(name.to_string_lossy()?.to_string()),
        None => None,
    };

    let parsed = CompilationUnit {
        name,
        files,
        ranges,
        lines,
        functions,
        fn_ranges,
    };

    debug_assert!(parsed
        .ranges
        .iter()
        .tuple_windows()
        .all(|(r1, r2)| r1.begin <= r2.begin));

    Ok(parsed)
}

fn parse_die_name(
    dwarf: &Dwarf<EndianRcSlice>,
    unit: &Unit<EndianRcSlice>,
    die: &gimli::DebuggingInformationEntry<EndianRcSlice>,
) -> gimli::Result<Option<String>> {
    let attr = match die.attr(DW_AT_name)? {
        Some(attr) => attr,
        None => return Ok(None),
    };
    match dwarf.attr_string(unit, attr.value()) {
        Ok(name) => Ok(Some(name.to_string_lossy()?.to_string())),
        Err(_) => Ok(None),
    }
}

fn parse_expr_attr(
    die: &gimli::DebuggingInformationEntry<EndianRcSlice>,
    attr: gimli::DwAt,
) -> gimli::Result<Option<Expression<EndianRcSlice>>> {
    Ok(die.attr(attr)?.and_then(|attr| match attr.value() {
        AttributeValue::Exprloc(expr) => Some(expr),
        _ => None,
    }))
}

/// Resolve the unit file table into openable source paths. Relative
/// directory and file entries are joined onto the unit compilation
/// directory; absolute entries win as-is (`PathBuf::push` semantics).
fn parse_files(
    dwarf: &Dwarf<EndianRcSlice>,
    unit: &Unit<EndianRcSlice>,
    header: &gimli::LineProgramHeader<EndianRcSlice>,
) -> gimli::Result<Vec<String>> {
    let comp_dir = match unit.comp_dir.as_ref() {
        Some(dir) => PathBuf::from(dir.to_string_lossy()?.into_owned()),
        None => PathBuf::new(),
    };

    let resolve = |entry: &gimli::FileEntry<EndianRcSlice>| -> gimli::Result<String> {
        let mut path = comp_dir.clone();
        if entry.directory_index() != 0 {
            if let Some(dir) = entry.directory(header) {
                path.push(dwarf.attr_string(unit, dir)?.to_string_lossy()?.as_ref());
            }
        }
        path.push(
            dwarf
                .attr_string(unit, entry.path_name())?
                .to_string_lossy()?
                .as_ref(),
        );
        Ok(path.to_string_lossy().into_owned())
    };

    // line rows address this table by index; dwarf before v5 leaves slot
    // zero without an entry
    let mut files = vec![match header.file(0) {
        Some(entry) => resolve(entry)?,
        None => String::new(),
    }];
    let mut index = 1;
    while let Some(entry) = header.file(index) {
        files.push(resolve(entry)?);
        index += 1;
    }
    Ok(files)
}

fn parse_symbols<'data: 'file, 'file, OBJ: Object<'data, 'file>>(
    obj_file: &'data OBJ,
) -> Vec<Symbol> {
    let tables = [obj_file.symbol_table(), obj_file.dynamic_symbol_table()];
    tables
        .into_iter()
        .flatten()
        .flat_map(|table| {
            table
                .symbols()
                .map(|symbol| Symbol {
                    kind: symbol.kind(),
                    name: symbol.name().unwrap_or_default().to_string(),
                    address: symbol.address(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
