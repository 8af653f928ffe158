//! LibXML2 FFI Wrapper Module
//!
//! The registry is parsed with libxml2 and immediately copied into an owned
//! [`Element`] tree. Nothing outside this module touches a libxml2 pointer, and the
//! libxml2 document is released before [`LibXml2Wrapper::parse_document`] returns.
//!
//! Only the leading fields of `xmlNode` and `xmlAttr` are declared. Those structs are
//! never constructed on the Rust side; they are only read through pointers owned by
//! the document, so declaring a prefix of the C layout is sufficient.

use std::ffi::CStr;
use std::marker::PhantomData;
use std::ptr;
use std::sync::Once;

use libc::{c_char, c_int, c_void};

use crate::error::{LoadError, LoadResult};
use crate::registry::Element;

/// libxml2's parser initialization is not thread-safe; run it exactly once.
static LIBXML2_INIT: Once = Once::new();

const XML_ELEMENT_NODE: c_int = 1;
const XML_TEXT_NODE: c_int = 3;
const XML_CDATA_SECTION_NODE: c_int = 4;

const XML_PARSE_NOERROR: c_int = 1 << 5;
const XML_PARSE_NOWARNING: c_int = 1 << 6;
const XML_PARSE_NONET: c_int = 1 << 11;

/// Opaque libxml2 document
#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

/// Leading fields of libxml2's `xmlNode`
#[repr(C)]
pub struct XmlNode {
    pub _private: *mut c_void,
    pub node_type: c_int,
    pub name: *const c_char,
    pub children: *mut XmlNode,
    pub last: *mut XmlNode,
    pub parent: *mut XmlNode,
    pub next: *mut XmlNode,
    pub prev: *mut XmlNode,
    pub doc: *mut XmlDoc,
    pub ns: *mut c_void,
    pub content: *mut c_char,
    pub properties: *mut XmlAttr,
}

/// Leading fields of libxml2's `xmlAttr`
#[repr(C)]
pub struct XmlAttr {
    pub _private: *mut c_void,
    pub attr_type: c_int,
    pub name: *const c_char,
    pub children: *mut XmlNode,
    pub last: *mut XmlNode,
    pub parent: *mut XmlNode,
    pub next: *mut XmlAttr,
    pub prev: *mut XmlAttr,
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();

    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlDocGetRootElement(doc: *const XmlDoc) -> *mut XmlNode;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    pub fn xmlGetLastError() -> *const xmlError;
    pub fn xmlResetLastError();
}

/// Owns a parsed libxml2 document and frees it on drop
struct XmlDocGuard {
    ptr: *mut XmlDoc,
    _phantom: PhantomData<XmlDoc>,
}

impl XmlDocGuard {
    /// # Safety
    ///
    /// The pointer must come from a libxml2 parse call and must not be freed elsewhere.
    unsafe fn from_raw(ptr: *mut XmlDoc) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        Some(XmlDocGuard {
            ptr,
            _phantom: PhantomData,
        })
    }

    fn root(&self) -> *mut XmlNode {
        unsafe { xmlDocGetRootElement(self.ptr) }
    }
}

impl Drop for XmlDocGuard {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// Read a libxml2 string, tolerating null and invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string owned by a live document.
unsafe fn lossy_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Concatenated text of the text/CDATA children of a node or attribute.
///
/// # Safety
///
/// `child` must be null or the first child of a node owned by a live document.
unsafe fn collect_text(mut child: *mut XmlNode) -> String {
    let mut text = String::new();
    while !child.is_null() {
        let node = unsafe { &*child };
        if node.node_type == XML_TEXT_NODE || node.node_type == XML_CDATA_SECTION_NODE {
            text.push_str(&unsafe { lossy_string(node.content) });
        }
        child = node.next;
    }
    text
}

/// Copy an element node and its descendants into an owned [`Element`].
///
/// # Safety
///
/// `node` must be a non-null element node owned by a live document.
unsafe fn convert_element(node: *mut XmlNode) -> Element {
    let node = unsafe { &*node };
    let mut element = Element::new(unsafe { lossy_string(node.name) });

    let mut attr = node.properties;
    while !attr.is_null() {
        let a = unsafe { &*attr };
        let name = unsafe { lossy_string(a.name) };
        let value = unsafe { collect_text(a.children) };
        element.push_attribute(name, value);
        attr = a.next;
    }

    let mut child = node.children;
    while !child.is_null() {
        let c = unsafe { &*child };
        match c.node_type {
            XML_ELEMENT_NODE => element.push_child(unsafe { convert_element(child) }),
            XML_TEXT_NODE | XML_CDATA_SECTION_NODE => {
                let content = unsafe { lossy_string(c.content) };
                if !content.trim().is_empty() {
                    element.push_text(&content);
                }
            }
            _ => {}
        }
        child = c.next;
    }

    element
}

/// Last parse error reported by libxml2 on this thread, as (line, message).
fn last_error() -> Option<(i32, String)> {
    unsafe {
        let err = xmlGetLastError();
        if err.is_null() {
            return None;
        }
        let message = lossy_string((*err).message);
        Some(((*err).line, message.trim().to_string()))
    }
}

/// Safe entry point to libxml2 document parsing
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a new wrapper, initializing libxml2 on first use.
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Parse a document from memory and return its root as an owned tree.
    ///
    /// `source_name` only labels error messages.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::ParseFailed` for malformed input, with libxml2's message
    /// and line, and `LoadError::EmptyDocument` when there is no root element.
    pub fn parse_document(&self, data: &[u8], source_name: &str) -> LoadResult<Element> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(LoadError::EmptyDocument {
                source_name: source_name.to_string(),
            });
        }
        let size = c_int::try_from(data.len())
            .map_err(|_| LoadError::DocumentTooLarge { size: data.len() })?;
        let options = XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET;

        unsafe {
            xmlResetLastError();
            let raw = xmlReadMemory(
                data.as_ptr() as *const c_char,
                size,
                ptr::null(),
                ptr::null(),
                options,
            );

            let doc = match XmlDocGuard::from_raw(raw) {
                Some(doc) => doc,
                None => {
                    // a null document with no recorded error means the parser context
                    // itself could not be allocated
                    let (line, message) = last_error().ok_or(LoadError::MemoryAllocation)?;
                    return Err(LoadError::ParseFailed {
                        source_name: source_name.to_string(),
                        line,
                        message,
                    });
                }
            };

            let root = doc.root();
            if root.is_null() {
                return Err(LoadError::EmptyDocument {
                    source_name: source_name.to_string(),
                });
            }

            Ok(convert_element(root))
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
