//! The system name table of the binary encoding.

/// The number of slots in the system name table. Slots past the last
/// assigned name are unassigned.
pub(crate) const SYSTEM_TABLE_SIZE: usize = 256;

/// Names by system name index, as fixed by the binary token encoding.
pub(crate) static SYSTEM_NAMES: &[&[u8]] = &[
    b"abs",
    b"add",
    b"aload",
    b"anchorsearch",
    b"and",
    b"arc",
    b"arcn",
    b"arct",
    b"arcto",
    b"array",
    b"ashow",
    b"astore",
    b"awidthshow",
    b"begin",
    b"bind",
    b"bitshift",
    b"ceiling",
    b"charpath",
    b"clear",
    b"cleartomark",
    b"clip",
    b"clippath",
    b"closepath",
    b"concat",
    b"concatmatrix",
    b"copy",
    b"copypage",
    b"cos",
    b"count",
    b"counttomark",
    b"currentcmykcolor",
    b"currentdash",
    b"currentdict",
    b"currentfile",
    b"currentfont",
    b"currentgray",
    b"currentgstate",
    b"currenthsbcolor",
    b"currentlinecap",
    b"currentlinejoin",
    b"currentlinewidth",
    b"currentmatrix",
    b"currentpoint",
    b"currentrgbcolor",
    b"currentshared",
    b"curveto",
    b"cvi",
    b"cvlit",
    b"cvn",
    b"cvr",
    b"cvrs",
    b"cvs",
    b"cvx",
    b"def",
    b"defineusername",
    b"dict",
    b"div",
    b"dtransform",
    b"dup",
    b"end",
    b"eoclip",
    b"eofill",
    b"eoviewclip",
    b"eq",
    b"exch",
    b"exec",
    b"exit",
    b"file",
    b"fill",
    b"findfont",
    b"flattenpath",
    b"floor",
    b"flush",
    b"flushfile",
    b"for",
    b"forall",
    b"ge",
    b"get",
    b"getinterval",
    b"grestore",
    b"gsave",
    b"gstate",
    b"gt",
    b"identmatrix",
    b"idiv",
    b"idtransform",
    b"if",
    b"ifelse",
    b"image",
    b"imagemask",
    b"index",
    b"ineofill",
    b"infill",
    b"initviewclip",
    b"inueofill",
    b"inufill",
    b"invertmatrix",
    b"itransform",
    b"known",
    b"le",
    b"length",
    b"lineto",
    b"load",
    b"loop",
    b"lt",
    b"makefont",
    b"matrix",
    b"maxlength",
    b"mod",
    b"moveto",
    b"mul",
    b"ne",
    b"neg",
    b"newpath",
    b"not",
    b"null",
    b"or",
    b"pathbbox",
    b"pathforall",
    b"pop",
    b"print",
    b"printobject",
    b"put",
    b"putinterval",
    b"rcurveto",
    b"read",
    b"readhexstring",
    b"readline",
    b"readstring",
    b"rectclip",
    b"rectfill",
    b"rectstroke",
    b"rectviewclip",
    b"repeat",
    b"restore",
    b"rlineto",
    b"rmoveto",
    b"roll",
    b"rotate",
    b"round",
    b"save",
    b"scale",
    b"scalefont",
    b"search",
    b"selectfont",
    b"setbbox",
    b"setcachedevice",
    b"setcachedevice2",
    b"setcharwidth",
    b"setcmykcolor",
    b"setdash",
    b"setfont",
    b"setgray",
    b"setgstate",
    b"sethsbcolor",
    b"setlinecap",
    b"setlinejoin",
    b"setlinewidth",
    b"setmatrix",
    b"setrgbcolor",
    b"setshared",
    b"shareddict",
    b"show",
    b"showpage",
    b"stop",
    b"stopped",
    b"store",
    b"string",
    b"stringwidth",
    b"stroke",
    b"strokepath",
    b"sub",
    b"systemdict",
    b"token",
    b"transform",
    b"translate",
    b"truncate",
    b"type",
    b"uappend",
    b"ucache",
    b"ueofill",
    b"ufill",
    b"undef",
    b"upath",
    b"userdict",
    b"ustroke",
    b"viewclip",
    b"viewclippath",
    b"where",
    b"widthshow",
    b"write",
    b"writehexstring",
    b"writeobject",
    b"writestring",
    b"wtranslation",
    b"xor",
    b"xshow",
    b"xyshow",
    b"yshow",
    b"FontDirectory",
    b"SharedFontDirectory",
    b"Courier",
    b"Courier-Bold",
    b"Courier-BoldOblique",
    b"Courier-Oblique",
    b"Helvetica",
    b"Helvetica-Bold",
    b"Helvetica-BoldOblique",
    b"Helvetica-Oblique",
    b"Symbol",
    b"Times-Bold",
    b"Times-BoldItalic",
    b"Times-Italic",
    b"Times-Roman",
    b"execuserobject",
    b"currentcolor",
    b"currentcolorspace",
    b"currentglobal",
    b"execform",
    b"filter",
    b"findresource",
    b"globaldict",
    b"makepattern",
    b"setcolor",
    b"setcolorspace",
    b"setglobal",
    b"setpagedevice",
    b"setpattern",
];
