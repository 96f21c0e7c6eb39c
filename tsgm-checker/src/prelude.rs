//! Built-in declarations every program sees
//!
//! Arrays, strings and functions have their members built into the checker;
//! the globals below are ordinary declarations so that they resolve like user
//! code.

pub const PRELUDE_PATH: &str = "lib.tsgm.d.ts";

pub const PRELUDE: &str = r#"
interface Math {
    readonly E: number;
    readonly LN10: number;
    readonly LN2: number;
    readonly LOG2E: number;
    readonly LOG10E: number;
    readonly PI: number;
    readonly SQRT1_2: number;
    readonly SQRT2: number;
    abs(x: number): number;
    acos(x: number): number;
    asin(x: number): number;
    atan(x: number): number;
    atan2(y: number, x: number): number;
    ceil(x: number): number;
    cos(x: number): number;
    exp(x: number): number;
    floor(x: number): number;
    log(x: number): number;
    max(...values: number[]): number;
    min(...values: number[]): number;
    pow(x: number, y: number): number;
    random(): number;
    round(x: number): number;
    sin(x: number): number;
    sqrt(x: number): number;
    tan(x: number): number;
}
declare const Math: Math;

interface StringConstructor {
    fromCharCode(...codes: number[]): string;
}
declare const String: StringConstructor;

interface SymbolConstructor {
    readonly iterator: symbol;
    (description?: string): symbol;
}
declare const Symbol: SymbolConstructor;

interface IteratorResult<T> {
    done: boolean;
    value: T;
}
interface Iterator<T> {
    next(value?: any): IteratorResult<T>;
}
interface Iterable<T> {
}

declare class Map<K, V> {
    constructor(entries?: any);
    readonly size: number;
    clear(): void;
    delete(key: K): boolean;
    entries(): Iterable<[K, V]>;
    forEach(callback: (value: V, key: K, map: Map<K, V>) => void): void;
    get(key: K): V;
    has(key: K): boolean;
    keys(): Iterable<K>;
    set(key: K, value: V): this;
    values(): Iterable<V>;
}

declare class Set<T> {
    constructor(values?: any);
    readonly size: number;
    add(value: T): this;
    clear(): void;
    delete(value: T): boolean;
    entries(): Iterable<[T, T]>;
    forEach(callback: (value: T, key: T, set: Set<T>) => void): void;
    has(value: T): boolean;
    keys(): Iterable<T>;
    values(): Iterable<T>;
}
"#;
