use super::{descriptor, ClassReadError};

const MAGIC: u32 = 0xCAFE_BABE;

/// Byte cursor over a class file. All reads are bounds-checked; running off
/// the end of a truncated artifact surfaces as `UnexpectedEof` rather than a
/// panic.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn read_u1(&mut self) -> Result<u8, ClassReadError> {
        let value = *self.bytes.get(self.pos).ok_or(ClassReadError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn read_u2(&mut self) -> Result<u16, ClassReadError> {
        let slice = self.read_slice(2)?;
        Ok(u16::from_be_bytes([slice[0], slice[1]]))
    }

    pub(crate) fn read_u4(&mut self) -> Result<u32, ClassReadError> {
        let slice = self.read_slice(4)?;
        Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassReadError> {
        let end = self.pos.checked_add(len).ok_or(ClassReadError::UnexpectedEof)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(ClassReadError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ClassReadError> {
        self.read_slice(len).map(|_| ())
    }

    fn expect_magic(&mut self) -> Result<(), ClassReadError> {
        if self.read_u4()? != MAGIC {
            return Err(ClassReadError::InvalidMagic);
        }
        Ok(())
    }
}

/// One constant pool entry. Entries whose payload is irrelevant to
/// reference discovery collapse into `Other`; index 0 and the upper halves
/// of long/double entries are `Unusable`.
#[derive(Debug, Clone)]
pub(crate) enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_index: u16 },
    MethodType,
    Dynamic { bootstrap_method_index: u16 },
    InvokeDynamic { bootstrap_method_index: u16 },
    Other,
    Unusable,
}

pub(crate) struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ByteReader<'_>) -> Result<Self, ClassReadError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    Constant::Utf8(String::from_utf8(bytes.to_vec())?)
                }
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    // long/double take two pool slots
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                8 => {
                    reader.read_u2()?;
                    Constant::Other
                }
                9 => Constant::FieldRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                10 => Constant::MethodRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                11 => Constant::InterfaceMethodRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                12 => Constant::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                },
                15 => {
                    // Whether the handle points at a field or a method is
                    // recovered from the referenced constant itself.
                    let _reference_kind = reader.read_u1()?;
                    Constant::MethodHandle {
                        reference_index: reader.read_u2()?,
                    }
                }
                16 => {
                    reader.read_u2()?; // descriptor index
                    Constant::MethodType
                }
                17 => {
                    let bootstrap_method_index = reader.read_u2()?;
                    reader.read_u2()?; // name and type index
                    Constant::Dynamic {
                        bootstrap_method_index,
                    }
                }
                18 => {
                    let bootstrap_method_index = reader.read_u2()?;
                    reader.read_u2()?; // name and type index
                    Constant::InvokeDynamic {
                        bootstrap_method_index,
                    }
                }
                19 | 20 => {
                    reader.read_u2()?;
                    Constant::Other
                }
                other => return Err(ClassReadError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    pub(crate) fn get(&self, index: u16) -> Result<&Constant, ClassReadError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassReadError::InvalidConstantIndex { index })
    }

    pub(crate) fn utf8(&self, index: u16) -> Result<&str, ClassReadError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassReadError::InvalidConstantIndex { index }),
        }
    }

    /// Internal name held by a `Class` constant.
    pub(crate) fn class_name(&self, index: u16) -> Result<&str, ClassReadError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassReadError::InvalidConstantIndex { index }),
        }
    }

    /// `(name, descriptor)` pair of a `NameAndType` constant.
    pub(crate) fn name_and_type(&self, index: u16) -> Result<(&str, &str), ClassReadError> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(ClassReadError::InvalidConstantIndex { index }),
        }
    }
}

/// A single parsed annotation: its type descriptor plus every element
/// value, with only the class-bearing value shapes retained.
#[derive(Debug, Clone)]
pub struct AnnotationInfo {
    pub type_descriptor: String,
    pub values: Vec<ElementValue>,
}

#[derive(Debug, Clone)]
pub enum ElementValue {
    /// Primitive or string constant; carries no class reference.
    Const,
    /// Enum constant value; the enum's type is a reference.
    Enum { type_descriptor: String },
    /// `SomeClass.class` value.
    ClassLiteral { descriptor: String },
    Nested(AnnotationInfo),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
    pub annotations: Vec<AnnotationInfo>,
    pub type_annotations: Vec<AnnotationInfo>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub descriptor: String,
    /// Internal names from the Exceptions attribute.
    pub exceptions: Vec<String>,
    pub annotations: Vec<AnnotationInfo>,
    pub parameter_annotations: Vec<AnnotationInfo>,
    pub type_annotations: Vec<AnnotationInfo>,
    /// Type annotations attached inside the Code attribute (local
    /// variables, casts).
    pub local_variable_annotations: Vec<AnnotationInfo>,
    pub code: Option<CodeBlock>,
}

#[derive(Debug, Clone)]
pub struct CodeBlock {
    pub bytecode: Vec<u8>,
    /// `(start_pc, line)` pairs from LineNumberTable, ascending by pc.
    pub line_numbers: Vec<(u16, u16)>,
}

#[derive(Debug, Clone)]
pub struct BootstrapMethod {
    /// Pool index of the bootstrap `MethodHandle`.
    pub handle_index: u16,
    /// Pool indexes of the static bootstrap arguments.
    pub argument_indexes: Vec<u16>,
}

/// Decoded structural shape of one class artifact.
pub struct ClassFile {
    pub(crate) pool: ConstantPool,
    /// Internal (slash-separated) name of the declared class.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    /// True when the InnerClasses attribute marks this class itself as
    /// having no declared simple name.
    pub anonymous: bool,
    pub annotations: Vec<AnnotationInfo>,
    pub type_annotations: Vec<AnnotationInfo>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub bootstrap_methods: Vec<BootstrapMethod>,
}

impl ClassFile {
    /// Decode a class file in a single pass. Accepts any major version the
    /// layout walk can traverse; nothing is executed or verified.
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassReadError> {
        let mut reader = ByteReader::new(bytes);
        reader.expect_magic()?;
        let _minor_version = reader.read_u2()?;
        let _major_version = reader.read_u2()?;
        let pool = ConstantPool::parse(&mut reader)?;

        let _access_flags = reader.read_u2()?;
        let this_class = reader.read_u2()?;
        let super_class = reader.read_u2()?;

        let name = pool.class_name(this_class)?.to_string();
        let super_name = if super_class == 0 {
            None
        } else {
            Some(pool.class_name(super_class)?.to_string())
        };

        let interfaces_count = reader.read_u2()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            let index = reader.read_u2()?;
            interfaces.push(pool.class_name(index)?.to_string());
        }

        let fields_count = reader.read_u2()?;
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            fields.push(parse_field(&mut reader, &pool)?);
        }

        let methods_count = reader.read_u2()?;
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            methods.push(parse_method(&mut reader, &pool)?);
        }

        let mut anonymous = false;
        let mut annotations = Vec::new();
        let mut type_annotations = Vec::new();
        let mut bootstrap_methods = Vec::new();

        let attributes_count = reader.read_u2()?;
        for _ in 0..attributes_count {
            let attribute_name_index = reader.read_u2()?;
            let attribute_length = reader.read_u4()? as usize;
            let attribute_name = pool.utf8(attribute_name_index)?;
            let slice = reader.read_slice(attribute_length)?;
            let mut sub = ByteReader::new(slice);

            match attribute_name {
                "InnerClasses" => {
                    let count = sub.read_u2()?;
                    for _ in 0..count {
                        let inner_class_index = sub.read_u2()?;
                        let _outer_class_index = sub.read_u2()?;
                        let inner_name_index = sub.read_u2()?;
                        let _inner_access = sub.read_u2()?;

                        // A zero inner-name index on the entry for this
                        // class means it has no declared simple name.
                        if inner_name_index == 0
                            && inner_class_index != 0
                            && pool.class_name(inner_class_index)? == name
                        {
                            anonymous = true;
                        }
                    }
                }
                "BootstrapMethods" => {
                    let count = sub.read_u2()?;
                    for _ in 0..count {
                        let handle_index = sub.read_u2()?;
                        let argument_count = sub.read_u2()?;
                        let mut argument_indexes = Vec::with_capacity(argument_count as usize);
                        for _ in 0..argument_count {
                            argument_indexes.push(sub.read_u2()?);
                        }
                        bootstrap_methods.push(BootstrapMethod {
                            handle_index,
                            argument_indexes,
                        });
                    }
                }
                "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                    annotations.extend(parse_annotations(&mut sub, &pool)?);
                }
                "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                    type_annotations.extend(parse_type_annotations(&mut sub, &pool)?);
                }
                _ => {}
            }
        }

        Ok(Self {
            pool,
            name,
            super_name,
            interfaces,
            anonymous,
            annotations,
            type_annotations,
            fields,
            methods,
            bootstrap_methods,
        })
    }

    /// Declared name in external dotted form.
    pub fn external_name(&self) -> String {
        descriptor::external_name(&self.name)
    }

    /// Human-readable summary of declared members, for trace output.
    /// Built lazily by callers since it allocates per member.
    pub fn structural_summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(super_name) = &self.super_name {
            lines.push(format!("extends {}", descriptor::external_name(super_name)));
        }
        for interface in &self.interfaces {
            lines.push(format!("implements {}", descriptor::external_name(interface)));
        }
        for field in &self.fields {
            lines.push(format!("field {} {}", field.name, field.descriptor));
        }
        for method in &self.methods {
            lines.push(format!("method {}{}", method.name, method.descriptor));
        }
        lines.join(", ")
    }
}

fn parse_field(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<FieldInfo, ClassReadError> {
    let _access_flags = reader.read_u2()?;
    let name_index = reader.read_u2()?;
    let descriptor_index = reader.read_u2()?;

    let name = pool.utf8(name_index)?.to_string();
    let descriptor = pool.utf8(descriptor_index)?.to_string();

    let mut annotations = Vec::new();
    let mut type_annotations = Vec::new();

    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let attribute_name_index = reader.read_u2()?;
        let attribute_length = reader.read_u4()? as usize;
        let attribute_name = pool.utf8(attribute_name_index)?;
        let slice = reader.read_slice(attribute_length)?;
        let mut sub = ByteReader::new(slice);

        match attribute_name {
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                annotations.extend(parse_annotations(&mut sub, pool)?);
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                type_annotations.extend(parse_type_annotations(&mut sub, pool)?);
            }
            _ => {}
        }
    }

    Ok(FieldInfo {
        name,
        descriptor,
        annotations,
        type_annotations,
    })
}

fn parse_method(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<MethodInfo, ClassReadError> {
    let _access_flags = reader.read_u2()?;
    let name_index = reader.read_u2()?;
    let descriptor_index = reader.read_u2()?;

    let name = pool.utf8(name_index)?.to_string();
    let descriptor = pool.utf8(descriptor_index)?.to_string();

    let mut exceptions = Vec::new();
    let mut annotations = Vec::new();
    let mut parameter_annotations = Vec::new();
    let mut type_annotations = Vec::new();
    let mut local_variable_annotations = Vec::new();
    let mut code = None;

    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let attribute_name_index = reader.read_u2()?;
        let attribute_length = reader.read_u4()? as usize;
        let attribute_name = pool.utf8(attribute_name_index)?;
        let slice = reader.read_slice(attribute_length)?;
        let mut sub = ByteReader::new(slice);

        match attribute_name {
            "Code" => {
                code = Some(parse_code(&mut sub, pool, &mut local_variable_annotations)?);
            }
            "Exceptions" => {
                let count = sub.read_u2()?;
                for _ in 0..count {
                    let index = sub.read_u2()?;
                    exceptions.push(pool.class_name(index)?.to_string());
                }
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                annotations.extend(parse_annotations(&mut sub, pool)?);
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let parameter_count = sub.read_u1()?;
                for _ in 0..parameter_count {
                    parameter_annotations.extend(parse_annotations(&mut sub, pool)?);
                }
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                type_annotations.extend(parse_type_annotations(&mut sub, pool)?);
            }
            _ => {}
        }
    }

    Ok(MethodInfo {
        name,
        descriptor,
        exceptions,
        annotations,
        parameter_annotations,
        type_annotations,
        local_variable_annotations,
        code,
    })
}

fn parse_code(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    local_variable_annotations: &mut Vec<AnnotationInfo>,
) -> Result<CodeBlock, ClassReadError> {
    let _max_stack = reader.read_u2()?;
    let _max_locals = reader.read_u2()?;
    let code_length = reader.read_u4()? as usize;
    let bytecode = reader.read_slice(code_length)?.to_vec();

    let exception_table_length = reader.read_u2()?;
    reader.skip(exception_table_length as usize * 8)?;

    let mut line_numbers = Vec::new();

    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let attribute_name_index = reader.read_u2()?;
        let attribute_length = reader.read_u4()? as usize;
        let attribute_name = pool.utf8(attribute_name_index)?;
        let slice = reader.read_slice(attribute_length)?;
        let mut sub = ByteReader::new(slice);

        match attribute_name {
            "LineNumberTable" => {
                let count = sub.read_u2()?;
                for _ in 0..count {
                    let start_pc = sub.read_u2()?;
                    let line = sub.read_u2()?;
                    line_numbers.push((start_pc, line));
                }
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                local_variable_annotations.extend(parse_type_annotations(&mut sub, pool)?);
            }
            _ => {}
        }
    }

    line_numbers.sort_unstable_by_key(|entry| entry.0);

    Ok(CodeBlock {
        bytecode,
        line_numbers,
    })
}

fn parse_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<AnnotationInfo>, ClassReadError> {
    let count = reader.read_u2()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(parse_annotation(reader, pool)?);
    }
    Ok(annotations)
}

fn parse_annotation(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<AnnotationInfo, ClassReadError> {
    let type_index = reader.read_u2()?;
    let type_descriptor = pool.utf8(type_index)?.to_string();

    let pair_count = reader.read_u2()?;
    let mut values = Vec::with_capacity(pair_count as usize);
    for _ in 0..pair_count {
        let _element_name_index = reader.read_u2()?;
        values.push(parse_element_value(reader, pool)?);
    }

    Ok(AnnotationInfo {
        type_descriptor,
        values,
    })
}

fn parse_element_value(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<ElementValue, ClassReadError> {
    let tag = reader.read_u1()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
            reader.read_u2()?;
            Ok(ElementValue::Const)
        }
        b'e' => {
            let type_name_index = reader.read_u2()?;
            let _const_name_index = reader.read_u2()?;
            Ok(ElementValue::Enum {
                type_descriptor: pool.utf8(type_name_index)?.to_string(),
            })
        }
        b'c' => {
            let class_info_index = reader.read_u2()?;
            Ok(ElementValue::ClassLiteral {
                descriptor: pool.utf8(class_info_index)?.to_string(),
            })
        }
        b'@' => Ok(ElementValue::Nested(parse_annotation(reader, pool)?)),
        b'[' => {
            let count = reader.read_u2()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(parse_element_value(reader, pool)?);
            }
            Ok(ElementValue::Array(values))
        }
        other => Err(ClassReadError::InvalidAnnotation(format!(
            "unknown element value tag {:#04x}",
            other
        ))),
    }
}

fn parse_type_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<AnnotationInfo>, ClassReadError> {
    let count = reader.read_u2()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        skip_type_annotation_target(reader)?;
        let path_length = reader.read_u1()?;
        reader.skip(path_length as usize * 2)?;
        annotations.push(parse_annotation(reader, pool)?);
    }
    Ok(annotations)
}

// Target info layouts per JVMS 4.7.20.1; only the lengths matter here.
fn skip_type_annotation_target(reader: &mut ByteReader<'_>) -> Result<(), ClassReadError> {
    let target_type = reader.read_u1()?;
    match target_type {
        0x00 | 0x01 => reader.skip(1),
        0x10 => reader.skip(2),
        0x11 | 0x12 => reader.skip(2),
        0x13..=0x15 => Ok(()),
        0x16 => reader.skip(1),
        0x17 => reader.skip(2),
        0x40 | 0x41 => {
            let table_length = reader.read_u2()?;
            reader.skip(table_length as usize * 6)
        }
        0x42 => reader.skip(2),
        0x43..=0x46 => reader.skip(2),
        0x47..=0x4B => reader.skip(3),
        other => Err(ClassReadError::InvalidAnnotation(format!(
            "unknown type annotation target {:#04x}",
            other
        ))),
    }
}
