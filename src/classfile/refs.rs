//! Single-pass extraction of every class reference reachable from a parsed
//! class artifact: declared shape, annotations, bytecode instructions, and
//! dynamic call sites.

use std::collections::HashSet;

use super::descriptor::{
    descriptor_class, external_name, method_descriptor, type_operand_class,
};
use super::reader::{AnnotationInfo, ClassFile, CodeBlock, Constant, ElementValue, MethodInfo};
use super::ClassReadError;

/// One discovered reference, tagged by the structural region it came from.
/// `used` is always an external dotted class name; `context` is the
/// human-readable description surfaced in trace output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassReference {
    Superclass { used: String, context: String },
    Interface { used: String, context: String },
    FieldType { used: String, context: String },
    MethodSignature { used: String, context: String },
    Annotation { used: String, context: String },
    Instruction { used: String, context: String },
    DynamicCall { used: String, context: String },
}

impl ClassReference {
    pub fn used(&self) -> &str {
        match self {
            ClassReference::Superclass { used, .. }
            | ClassReference::Interface { used, .. }
            | ClassReference::FieldType { used, .. }
            | ClassReference::MethodSignature { used, .. }
            | ClassReference::Annotation { used, .. }
            | ClassReference::Instruction { used, .. }
            | ClassReference::DynamicCall { used, .. } => used,
        }
    }

    pub fn context(&self) -> &str {
        match self {
            ClassReference::Superclass { context, .. }
            | ClassReference::Interface { context, .. }
            | ClassReference::FieldType { context, .. }
            | ClassReference::MethodSignature { context, .. }
            | ClassReference::Annotation { context, .. }
            | ClassReference::Instruction { context, .. }
            | ClassReference::DynamicCall { context, .. } => context,
        }
    }
}

/// Walk a parsed class and collect every structural reference it makes.
/// Self-references are included; callers drop them against the class's own
/// symbol (a class naming itself is not a use).
pub fn class_references(class: &ClassFile) -> Result<Vec<ClassReference>, ClassReadError> {
    let mut walk = ReferenceWalk {
        class,
        owner: class.external_name(),
        out: Vec::new(),
    };
    walk.run()?;
    Ok(walk.out)
}

struct ReferenceWalk<'a> {
    class: &'a ClassFile,
    owner: String,
    out: Vec<ClassReference>,
}

impl<'a> ReferenceWalk<'a> {
    fn run(&mut self) -> Result<(), ClassReadError> {
        if let Some(super_name) = &self.class.super_name {
            self.out.push(ClassReference::Superclass {
                used: external_name(super_name),
                context: format!("super of {}", self.owner),
            });
        }

        for interface in &self.class.interfaces {
            self.out.push(ClassReference::Interface {
                used: external_name(interface),
                context: format!("implemented by {}", self.owner),
            });
        }

        for annotation in &self.class.annotations {
            self.annotation_refs(annotation, "annotation");
        }
        for annotation in &self.class.type_annotations {
            self.annotation_refs(annotation, "type annotation");
        }

        for field in &self.class.fields {
            if let Some(used) = descriptor_class(&field.descriptor) {
                self.out.push(ClassReference::FieldType {
                    used: external_name(used),
                    context: format!("{} class field", self.owner),
                });
            }
            for annotation in &field.annotations {
                self.annotation_refs(annotation, "field annotation");
            }
            for annotation in &field.type_annotations {
                self.annotation_refs(annotation, "field type annotation");
            }
        }

        for method in &self.class.methods {
            self.method_refs(method)?;
        }

        Ok(())
    }

    fn method_refs(&mut self, method: &MethodInfo) -> Result<(), ClassReadError> {
        let qualified = format!("{}.{}", self.owner, method.name);
        let decoded = method_descriptor(&method.descriptor)?;

        if let Some(used) = descriptor_class(&decoded.return_type) {
            self.out.push(ClassReference::MethodSignature {
                used: external_name(used),
                context: format!("{} declared method return", qualified),
            });
        }
        for parameter in &decoded.parameters {
            if let Some(used) = descriptor_class(parameter) {
                self.out.push(ClassReference::MethodSignature {
                    used: external_name(used),
                    context: format!("{} declared method argument", qualified),
                });
            }
        }
        for exception in &method.exceptions {
            self.out.push(ClassReference::MethodSignature {
                used: external_name(exception),
                context: format!("{} thrown exception", qualified),
            });
        }

        for annotation in &method.annotations {
            self.annotation_refs(annotation, "method annotation");
        }
        for annotation in &method.parameter_annotations {
            self.annotation_refs(annotation, "parameter annotation");
        }
        for annotation in &method.type_annotations {
            self.annotation_refs(annotation, "method type annotation");
        }
        for annotation in &method.local_variable_annotations {
            self.annotation_refs(annotation, "local variable annotation");
        }

        if let Some(code) = &method.code {
            self.code_refs(&method.name, code)?;
        }

        Ok(())
    }

    fn annotation_refs(&mut self, annotation: &AnnotationInfo, site: &str) {
        if let Some(used) = descriptor_class(&annotation.type_descriptor) {
            self.out.push(ClassReference::Annotation {
                used: external_name(used),
                context: format!("{} {}", self.owner, site),
            });
        }
        self.element_value_refs(&annotation.values);
    }

    fn element_value_refs(&mut self, values: &[ElementValue]) {
        for value in values {
            match value {
                ElementValue::Const => {}
                ElementValue::Enum { type_descriptor } => {
                    if let Some(used) = descriptor_class(type_descriptor) {
                        self.out.push(ClassReference::Annotation {
                            used: external_name(used),
                            context: format!("{} annotation enum value", self.owner),
                        });
                    }
                }
                ElementValue::ClassLiteral { descriptor } => {
                    if let Some(used) = descriptor_class(descriptor) {
                        self.out.push(ClassReference::Annotation {
                            used: external_name(used),
                            context: format!("{} annotation class value", self.owner),
                        });
                    }
                }
                ElementValue::Nested(annotation) => {
                    self.annotation_refs(annotation, "nested annotation");
                }
                ElementValue::Array(values) => self.element_value_refs(values),
            }
        }
    }

    fn code_refs(&mut self, method_name: &str, code: &CodeBlock) -> Result<(), ClassReadError> {
        let bytecode = &code.bytecode;
        let mut offset = 0usize;
        let mut line: Option<u16> = None;
        let mut line_index = 0usize;

        while offset < bytecode.len() {
            while line_index < code.line_numbers.len()
                && code.line_numbers[line_index].0 as usize <= offset
            {
                line = Some(code.line_numbers[line_index].1);
                line_index += 1;
            }

            let opcode = bytecode[offset];
            match opcode {
                // ldc / ldc_w / ldc2_w
                0x12 | 0x13 | 0x14 => {
                    let index = if opcode == 0x12 {
                        *bytecode.get(offset + 1).ok_or(ClassReadError::UnexpectedEof)? as u16
                    } else {
                        read_code_u16(bytecode, offset + 1)?
                    };
                    self.constant_load(index, method_name, line)?;
                }
                // getstatic / putstatic / getfield / putfield
                0xb2..=0xb5 => {
                    let index = read_code_u16(bytecode, offset + 1)?;
                    self.field_access(index, method_name, line)?;
                }
                // invokevirtual / invokespecial / invokestatic / invokeinterface
                0xb6..=0xb9 => {
                    let index = read_code_u16(bytecode, offset + 1)?;
                    self.method_call(index, line)?;
                }
                // invokedynamic
                0xba => {
                    let index = read_code_u16(bytecode, offset + 1)?;
                    self.dynamic_call(index, line)?;
                }
                // new / anewarray / checkcast / instanceof / multianewarray
                0xbb | 0xbd | 0xc0 | 0xc1 | 0xc5 => {
                    let index = read_code_u16(bytecode, offset + 1)?;
                    let name = self.class.pool.class_name(index)?;
                    if let Some(used) = type_operand_class(name) {
                        self.push_instruction(used, method_name, "type instruction", line);
                    }
                }
                _ => {}
            }

            offset += instruction_length(bytecode, offset)?;
        }

        Ok(())
    }

    fn constant_load(
        &mut self,
        index: u16,
        method_name: &str,
        line: Option<u16>,
    ) -> Result<(), ClassReadError> {
        match self.class.pool.get(index)? {
            Constant::Class { name_index } => {
                let name = self.class.pool.utf8(*name_index)?;
                if let Some(used) = type_operand_class(name) {
                    self.push_instruction(used, method_name, "class literal", line);
                }
            }
            Constant::MethodHandle { .. } => {
                let mut visited = HashSet::new();
                self.bootstrap_argument(index, line, &mut visited)?;
            }
            Constant::Dynamic { .. } => {
                let mut visited = HashSet::new();
                self.bootstrap_argument(index, line, &mut visited)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn field_access(
        &mut self,
        index: u16,
        method_name: &str,
        line: Option<u16>,
    ) -> Result<(), ClassReadError> {
        let (_, name_and_type_index) = member_ref(self.class.pool.get(index)?, index)?;
        let (_, field_descriptor) = self.class.pool.name_and_type(name_and_type_index)?;
        if let Some(used) = descriptor_class(field_descriptor) {
            let used = used.to_string();
            self.push_instruction(&used, method_name, "field instruction", line);
        }
        Ok(())
    }

    fn method_call(&mut self, index: u16, line: Option<u16>) -> Result<(), ClassReadError> {
        let (class_index, name_and_type_index) = member_ref(self.class.pool.get(index)?, index)?;
        let owner = self.class.pool.class_name(class_index)?.to_string();
        let (callee, call_descriptor) = self.class.pool.name_and_type(name_and_type_index)?;
        let callee = callee.to_string();
        let call_descriptor = call_descriptor.to_string();
        self.member_refs(&owner, &callee, &call_descriptor, line)
    }

    /// Register owner plus signature types of a field or method member
    /// reference, as reached from a call instruction or a method handle.
    fn member_refs(
        &mut self,
        member_owner: &str,
        member_name: &str,
        member_descriptor: &str,
        line: Option<u16>,
    ) -> Result<(), ClassReadError> {
        if member_descriptor.starts_with('(') {
            let decoded = method_descriptor(member_descriptor)?;
            if let Some(used) = descriptor_class(&decoded.return_type) {
                let used = used.to_string();
                self.push_instruction(&used, member_name, "method return", line);
            }
            for parameter in &decoded.parameters {
                if let Some(used) = descriptor_class(parameter) {
                    let used = used.to_string();
                    self.push_instruction(&used, member_name, "method argument", line);
                }
            }
        } else if let Some(used) = descriptor_class(member_descriptor) {
            let used = used.to_string();
            self.push_instruction(&used, member_name, "field instruction", line);
        }

        if let Some(used) = type_operand_class(member_owner) {
            let used = used.to_string();
            self.push_instruction(&used, member_name, "method call", line);
        }
        Ok(())
    }

    fn dynamic_call(&mut self, index: u16, line: Option<u16>) -> Result<(), ClassReadError> {
        let bootstrap_index = match self.class.pool.get(index)? {
            Constant::InvokeDynamic {
                bootstrap_method_index,
            } => *bootstrap_method_index,
            _ => return Err(ClassReadError::InvalidConstantIndex { index }),
        };

        let mut visited = HashSet::new();
        self.bootstrap_refs(bootstrap_index, line, &mut visited)
    }

    fn bootstrap_refs(
        &mut self,
        bootstrap_index: u16,
        line: Option<u16>,
        visited: &mut HashSet<u16>,
    ) -> Result<(), ClassReadError> {
        // A malformed pool can make dynamic constants reference their own
        // bootstrap method; the visited set bounds the recursion.
        if !visited.insert(bootstrap_index) {
            return Ok(());
        }

        let bootstrap = self
            .class
            .bootstrap_methods
            .get(bootstrap_index as usize)
            .ok_or(ClassReadError::InvalidBootstrapIndex {
                index: bootstrap_index,
            })?
            .clone();

        self.handle_refs(bootstrap.handle_index, line, true)?;

        for argument_index in bootstrap.argument_indexes {
            self.bootstrap_argument(argument_index, line, visited)?;
        }
        Ok(())
    }

    /// Register one static bootstrap argument, unwrapping nested method
    /// handles and dynamically-computed constants to their owning types.
    fn bootstrap_argument(
        &mut self,
        argument_index: u16,
        line: Option<u16>,
        visited: &mut HashSet<u16>,
    ) -> Result<(), ClassReadError> {
        match self.class.pool.get(argument_index)? {
            Constant::Class { name_index } => {
                let name = self.class.pool.utf8(*name_index)?.to_string();
                if let Some(used) = type_operand_class(&name) {
                    let used = used.to_string();
                    self.out.push(ClassReference::DynamicCall {
                        used: external_name(&used),
                        context: self.code_context(None, "dynamic method argument type", line),
                    });
                }
            }
            Constant::MethodHandle { .. } => {
                self.handle_refs(argument_index, line, false)?;
            }
            Constant::Dynamic {
                bootstrap_method_index,
            } => {
                let bootstrap_method_index = *bootstrap_method_index;
                self.bootstrap_refs(bootstrap_method_index, line, visited)?;
            }
            // Method types, strings and numeric constants carry no class
            // reference of their own.
            _ => {}
        }
        Ok(())
    }

    fn handle_refs(
        &mut self,
        handle_index: u16,
        line: Option<u16>,
        is_bootstrap: bool,
    ) -> Result<(), ClassReadError> {
        let reference_index = match self.class.pool.get(handle_index)? {
            Constant::MethodHandle {
                reference_index, ..
            } => *reference_index,
            _ => return Err(ClassReadError::InvalidConstantIndex { index: handle_index }),
        };

        let (class_index, name_and_type_index) =
            member_ref(self.class.pool.get(reference_index)?, reference_index)?;
        let owner = self.class.pool.class_name(class_index)?.to_string();
        let (member_name, member_descriptor) =
            self.class.pool.name_and_type(name_and_type_index)?;
        let member_name = member_name.to_string();
        let member_descriptor = member_descriptor.to_string();

        if is_bootstrap {
            // Only the owner matters for the bootstrap method itself; the
            // signature types belong to the metafactory, not the call site.
            if let Some(used) = type_operand_class(&owner) {
                let used = used.to_string();
                self.out.push(ClassReference::DynamicCall {
                    used: external_name(&used),
                    context: self.code_context(Some(&member_name), "dynamic method handle", line),
                });
            }
            return Ok(());
        }

        self.member_refs(&owner, &member_name, &member_descriptor, line)
    }

    fn push_instruction(
        &mut self,
        used_internal: &str,
        method_name: &str,
        detail: &str,
        line: Option<u16>,
    ) {
        self.out.push(ClassReference::Instruction {
            used: external_name(used_internal),
            context: self.code_context(Some(method_name), detail, line),
        });
    }

    // Matches the trace format the structural scanner has always printed:
    // owner[:method] (detail)[line]
    fn code_context(&self, method_name: Option<&str>, detail: &str, line: Option<u16>) -> String {
        let method = method_name.map(|name| format!(":{}", name)).unwrap_or_default();
        let line = line.map(|value| value.to_string()).unwrap_or_default();
        format!("{}{} ({})[{}]", self.owner, method, detail, line)
    }
}

fn member_ref(constant: &Constant, index: u16) -> Result<(u16, u16), ClassReadError> {
    match constant {
        Constant::FieldRef {
            class_index,
            name_and_type_index,
        }
        | Constant::MethodRef {
            class_index,
            name_and_type_index,
        }
        | Constant::InterfaceMethodRef {
            class_index,
            name_and_type_index,
        } => Ok((*class_index, *name_and_type_index)),
        _ => Err(ClassReadError::InvalidConstantIndex { index }),
    }
}

fn read_code_u16(bytecode: &[u8], offset: usize) -> Result<u16, ClassReadError> {
    let high = *bytecode.get(offset).ok_or(ClassReadError::UnexpectedEof)?;
    let low = *bytecode.get(offset + 1).ok_or(ClassReadError::UnexpectedEof)?;
    Ok(u16::from_be_bytes([high, low]))
}

fn read_code_i32(bytecode: &[u8], offset: usize) -> Result<i32, ClassReadError> {
    let slice = bytecode
        .get(offset..offset + 4)
        .ok_or(ClassReadError::UnexpectedEof)?;
    Ok(i32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Total byte length of the instruction at `offset`, including the opcode.
fn instruction_length(bytecode: &[u8], offset: usize) -> Result<usize, ClassReadError> {
    let opcode = bytecode[offset];
    let length = match opcode {
        0x00..=0x0f => 1,          // nop, consts
        0x10 => 2,                 // bipush
        0x11 => 3,                 // sipush
        0x12 => 2,                 // ldc
        0x13 | 0x14 => 3,          // ldc_w, ldc2_w
        0x15..=0x19 => 2,          // loads with local index
        0x1a..=0x35 => 1,          // loads_n, array loads
        0x36..=0x3a => 2,          // stores with local index
        0x3b..=0x83 => 1,          // stores_n, stack ops, arithmetic
        0x84 => 3,                 // iinc
        0x85..=0x98 => 1,          // conversions, comparisons
        0x99..=0xa8 => 3,          // branches, goto, jsr
        0xa9 => 2,                 // ret
        0xaa => {
            // tableswitch: 0-3 pad bytes to a 4-byte boundary, then
            // default, low, high, and (high - low + 1) jump offsets
            let base = (offset + 4) & !3;
            let low = read_code_i32(bytecode, base + 4)?;
            let high = read_code_i32(bytecode, base + 8)?;
            if high < low {
                return Err(ClassReadError::UnknownOpcode { opcode, offset });
            }
            let count = (high - low) as usize + 1;
            base - offset + 12 + count * 4
        }
        0xab => {
            // lookupswitch: pad, default, npairs, then npairs (match, offset) pairs
            let base = (offset + 4) & !3;
            let npairs = read_code_i32(bytecode, base + 4)?;
            if npairs < 0 {
                return Err(ClassReadError::UnknownOpcode { opcode, offset });
            }
            base - offset + 8 + npairs as usize * 8
        }
        0xac..=0xb1 => 1,          // returns
        0xb2..=0xb8 => 3,          // field access, invokes
        0xb9 | 0xba => 5,          // invokeinterface, invokedynamic
        0xbb => 3,                 // new
        0xbc => 2,                 // newarray
        0xbd => 3,                 // anewarray
        0xbe | 0xbf => 1,          // arraylength, athrow
        0xc0 | 0xc1 => 3,          // checkcast, instanceof
        0xc2 | 0xc3 => 1,          // monitorenter, monitorexit
        0xc4 => {
            // wide: modified opcode plus a 16-bit local index, with an
            // extra 16-bit constant for iinc
            let modified = *bytecode.get(offset + 1).ok_or(ClassReadError::UnexpectedEof)?;
            if modified == 0x84 {
                6
            } else {
                4
            }
        }
        0xc5 => 4,                 // multianewarray
        0xc6 | 0xc7 => 3,          // ifnull, ifnonnull
        0xc8 | 0xc9 => 5,          // goto_w, jsr_w
        other => return Err(ClassReadError::UnknownOpcode { opcode: other, offset }),
    };
    Ok(length)
}
