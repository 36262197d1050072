use super::ClassReadError;

/// Convert a JVM internal name (`org/example/Foo$Bar`) to the external
/// dotted form used throughout analysis (`org.example.Foo.Bar`).
///
/// Nested classes are flattened with the same separator as packages, so a
/// reference to an inner class also reads naturally in trace output.
pub fn external_name(internal: &str) -> String {
    internal.replace('/', ".").replace('$', ".")
}

/// Extract the element class of a field descriptor, unwrapping array
/// nesting of arbitrary depth (`[[Lorg/example/Foo;` yields
/// `org/example/Foo`). Primitive descriptors carry no class reference and
/// yield `None`.
pub fn descriptor_class(descriptor: &str) -> Option<&str> {
    let element = descriptor.trim_start_matches('[');
    element.strip_prefix('L')?.strip_suffix(';')
}

/// Class constants in bytecode hold either a plain internal name or, for
/// array creation and casts, an array descriptor. Resolve both to the
/// element class internal name.
pub fn type_operand_class(name: &str) -> Option<&str> {
    if name.starts_with('[') {
        descriptor_class(name)
    } else {
        Some(name)
    }
}

/// Decoded method descriptor: raw field descriptors for each parameter and
/// the return type (`V` for void).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<String>,
    pub return_type: String,
}

/// Split a method descriptor such as `(I[Lorg/example/Foo;)V` into its
/// parameter and return descriptors.
pub fn method_descriptor(descriptor: &str) -> Result<MethodDescriptor, ClassReadError> {
    let malformed = || ClassReadError::InvalidDescriptor(descriptor.to_string());

    let rest = descriptor.strip_prefix('(').ok_or_else(malformed)?;
    let (params, return_type) = rest.split_once(')').ok_or_else(malformed)?;

    let mut parameters = Vec::new();
    let bytes = params.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        while bytes.get(pos) == Some(&b'[') {
            pos += 1;
        }
        match bytes.get(pos) {
            Some(b'L') => {
                let end = params[pos..].find(';').ok_or_else(malformed)? + pos;
                pos = end + 1;
            }
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => pos += 1,
            _ => return Err(malformed()),
        }
        parameters.push(params[start..pos].to_string());
    }

    if return_type.is_empty() {
        return Err(malformed());
    }

    Ok(MethodDescriptor {
        parameters,
        return_type: return_type.to_string(),
    })
}
